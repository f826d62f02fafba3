//! 임계값 알림 감시.

pub mod batcher;
pub mod evaluator;
pub mod watchdog;

pub use batcher::{FlushOutcome, NotificationBatcher};
pub use evaluator::{reduce_trigger, AlertEvaluator};
pub use watchdog::WatchdogCycle;
