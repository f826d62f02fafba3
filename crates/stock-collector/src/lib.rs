//! 장중 스케줄러와 임계값 알림 감시.
//!
//! - [`modules::Daemon`]: 거래 시간에만 태스크를 주기 실행
//! - [`alerts::WatchdogCycle`]: 알림 전략 평가 후 메시지 한 건으로 통보
//! - [`modules::TickSynchronizer`]: 벤더 시세를 시계열 저장소로 동기화

pub mod alerts;
pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use stats::CycleStats;
