//! 장중 태스크 스케줄러 (데몬).
//!
//! 장중에는 등록된 태스크를 순서대로 한 번씩 실행하고, 틱 사이 간격이
//! `min_tick` 이상이 되도록 대기합니다. 장외에는 태스크를 실행하지 않고
//! `closed_idle` 간격으로 캘린더만 다시 확인합니다.
//!
//! 태스크 실패(에러 반환, panic)는 로그만 남기고 다음 태스크로 넘어갑니다.
//! 종료는 [`CancellationToken`]으로 요청하며, 대기 중에만 즉시 반영되고
//! 실행 중인 태스크는 끝까지 실행됩니다.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use stock_core::Clock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::DaemonConfig;
use crate::error::CollectorError;
use crate::modules::calendar::TradingCalendar;
use crate::Result;

/// 스케줄러에 등록되는 작업 단위.
#[async_trait]
pub trait SchedulerTask: Send {
    /// 태스크 이름 (로그용)
    fn name(&self) -> &str;

    /// 1회 실행.
    async fn run(&mut self) -> Result<()>;
}

/// 데몬 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Stopped,
    Running,
    Stopping,
}

/// `Daemon::run` 종료 시 집계
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonSummary {
    /// 장중 틱 수
    pub ticks: u64,
    /// 장외 확인 횟수
    pub closed_checks: u64,
    /// 실패한 태스크 실행 수
    pub task_failures: u64,
}

/// 장중 태스크 스케줄러.
pub struct Daemon {
    config: DaemonConfig,
    calendar: TradingCalendar,
    clock: Arc<dyn Clock>,
    tasks: Vec<Box<dyn SchedulerTask>>,
    state: DaemonState,
}

impl Daemon {
    /// 데몬 생성. 틱/대기 간격이 0이면 설정 에러.
    pub fn new(
        config: DaemonConfig,
        calendar: TradingCalendar,
        clock: Arc<dyn Clock>,
        tasks: Vec<Box<dyn SchedulerTask>>,
    ) -> Result<Self> {
        if config.min_tick_seconds == 0 {
            return Err(CollectorError::Config(
                "DAEMON_MIN_TICK_SECONDS는 0보다 커야 합니다".to_string(),
            ));
        }
        if config.closed_idle_seconds == 0 {
            return Err(CollectorError::Config(
                "DAEMON_CLOSED_IDLE_SECONDS는 0보다 커야 합니다".to_string(),
            ));
        }

        Ok(Self {
            config,
            calendar,
            clock,
            tasks,
            state: DaemonState::Stopped,
        })
    }

    pub fn state(&self) -> DaemonState {
        self.state
    }

    /// 등록된 태스크 이름 (실행 순서)
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    /// 종료 요청이 올 때까지 스케줄 루프 실행.
    pub async fn run(&mut self, shutdown: CancellationToken) -> DaemonSummary {
        self.state = DaemonState::Running;
        let mut summary = DaemonSummary::default();

        info!(
            tasks = ?self.task_names(),
            min_tick_secs = self.config.min_tick_seconds,
            closed_idle_secs = self.config.closed_idle_seconds,
            "스케줄러 시작"
        );

        while !shutdown.is_cancelled() {
            let now = self.clock.now();

            if !self.calendar.is_open_at(now) {
                summary.closed_checks += 1;
                let wait = self.closed_wait(now);
                debug!(wait_secs = wait.as_secs_f64(), "장외 시간, 대기");
                if !sleep_or_cancel(&shutdown, wait).await {
                    break;
                }
                continue;
            }

            summary.ticks += 1;
            let tick = summary.ticks;
            let started = Instant::now();

            for task in self.tasks.iter_mut() {
                let name = task.name().to_string();
                if let Err(e) = run_task(task.as_mut()).await {
                    summary.task_failures += 1;
                    error!(task = %name, tick, error = %e, "태스크 실패");
                }
            }

            let elapsed = started.elapsed();
            debug!(tick, elapsed_ms = elapsed.as_millis() as u64, "틱 완료");

            if let Some(remaining) = self.config.min_tick().checked_sub(elapsed) {
                if !remaining.is_zero() && !sleep_or_cancel(&shutdown, remaining).await {
                    break;
                }
            }
        }

        self.state = DaemonState::Stopping;
        info!(
            ticks = summary.ticks,
            closed_checks = summary.closed_checks,
            task_failures = summary.task_failures,
            "스케줄러 종료 중"
        );
        self.state = DaemonState::Stopped;

        summary
    }

    /// 장외 대기 시간: `closed_idle`과 다음 개장까지 남은 시간 중 짧은 쪽.
    fn closed_wait(&self, now: chrono::DateTime<chrono::Utc>) -> Duration {
        let idle = self.config.closed_idle();
        match self.calendar.until_next_open(now).to_std() {
            Ok(until_open) if !until_open.is_zero() => idle.min(until_open),
            _ => idle,
        }
    }
}

/// 태스크 1회 실행. panic은 태스크 에러로 변환합니다.
async fn run_task(task: &mut dyn SchedulerTask) -> Result<()> {
    let name = task.name().to_string();
    match AssertUnwindSafe(task.run()).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(CollectorError::Task {
            task: name,
            reason: format!("panic: {}", panic_message(panic.as_ref())),
        }),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown".to_string()
    }
}

/// 대기 완료 시 `true`, 종료 요청 시 `false`.
async fn sleep_or_cancel(shutdown: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
