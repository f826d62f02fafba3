//! 도메인 모델.

pub mod alert;
pub mod market;
pub mod table;
pub mod tick;

pub use alert::{AlertOperator, AlertStrategy};
pub use market::MarketType;
pub use table::{cell_to_decimal, QueryTable, TIME_COLUMN};
pub use tick::{QuotedPrice, StockTick, ORDER_BOOK_DEPTH};
