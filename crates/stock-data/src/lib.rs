//! 저장소 어댑터.
//!
//! - [`InfluxClient`]: InfluxDB 1.x HTTP API 기반 [`TimeSeriesStore`] 구현
//! - [`PgAlertStrategyRepository`]: PostgreSQL 기반 [`AlertStrategyRepository`] 구현
//! - [`SinaQuoteClient`]: Sina 실시간 시세 기반 [`QuoteClient`] 구현
//! - [`Database`]: 데몬용 연결 풀 설정
//!
//! [`TimeSeriesStore`]: stock_core::TimeSeriesStore
//! [`AlertStrategyRepository`]: stock_core::AlertStrategyRepository
//! [`QuoteClient`]: stock_core::QuoteClient

pub mod database;
pub mod influx;
pub mod line_protocol;
pub mod sina;
pub mod strategy_repo;

pub use database::{Database, DatabaseConfig};
pub use influx::{InfluxClient, InfluxConfig};
pub use sina::{SinaConfig, SinaQuoteClient};
pub use strategy_repo::PgAlertStrategyRepository;
