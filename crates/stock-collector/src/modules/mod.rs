//! 스케줄링 모듈.

pub mod calendar;
pub mod daemon;
pub mod tick_sync;

pub use calendar::{parse_sessions, TradingCalendar, TradingSession};
pub use daemon::{Daemon, DaemonState, DaemonSummary, SchedulerTask};
pub use tick_sync::{mainland_synchronizers, TickSynchronizer};
