//! 주식 감시 데몬의 도메인 타입과 외부 협력자 포트.
//!
//! 스케줄러, 알림 감시견, 동기화 작업은 이 crate의 trait만 바라보며
//! 실제 저장소/클라이언트 구현은 `stock-data` 등 바깥 crate가 담당합니다.

pub mod domain;
pub mod error;
pub mod ports;

pub use domain::{
    cell_to_decimal, AlertOperator, AlertStrategy, MarketType, QueryTable, QuotedPrice,
    StockTick, ORDER_BOOK_DEPTH, TIME_COLUMN,
};
pub use error::StoreError;
pub use ports::{AlertStrategyRepository, Clock, QuoteClient, SystemClock, TimeSeriesStore};
