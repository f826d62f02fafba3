//! 알림 감시 사이클.
//!
//! 1. 활성 전략 조회 (id 순)
//! 2. 전략별 평가, 트리거 시 최신 시세 요약을 배치에 추가
//! 3. 사이클 끝에 한 번 flush
//!
//! 전략 단위 실패는 로그만 남기고 다음 전략으로 넘어갑니다.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono_tz::Tz;
use stock_core::{AlertStrategy, AlertStrategyRepository, Clock, TimeSeriesStore};
use stock_notification::NotificationSender;
use tracing::{debug, info, warn};

use crate::alerts::batcher::NotificationBatcher;
use crate::alerts::evaluator::AlertEvaluator;
use crate::error::CollectorError;
use crate::modules::daemon::SchedulerTask;
use crate::stats::CycleStats;
use crate::Result;

/// 감시 사이클.
pub struct WatchdogCycle {
    repository: Arc<dyn AlertStrategyRepository>,
    store: Arc<dyn TimeSeriesStore>,
    sender: Arc<dyn NotificationSender>,
    evaluator: AlertEvaluator,
    batcher: NotificationBatcher,
    clock: Arc<dyn Clock>,
    timezone: Tz,
}

impl WatchdogCycle {
    pub fn new(
        repository: Arc<dyn AlertStrategyRepository>,
        store: Arc<dyn TimeSeriesStore>,
        sender: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
        lookback: chrono::Duration,
    ) -> Self {
        Self {
            repository,
            evaluator: AlertEvaluator::new(store.clone(), lookback),
            store,
            sender,
            batcher: NotificationBatcher::new(),
            clock,
            timezone: chrono_tz::Asia::Shanghai,
        }
    }

    /// 메시지 헤더 시각의 타임존 (기본 Asia/Shanghai).
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// 감시 1회 실행.
    ///
    /// 전략 목록 조회에 실패하면 flush 없이 에러를 반환합니다.
    pub async fn watch(&mut self) -> Result<CycleStats> {
        let start = Instant::now();
        let mut stats = CycleStats::new();

        let strategies = self
            .repository
            .list_enabled()
            .await
            .map_err(|e| CollectorError::query("alert_strategy", e))?;

        let now = self.clock.now();
        debug!(count = strategies.len(), "활성 전략 조회 완료");

        for strategy in strategies.iter().filter(|s| s.enabled) {
            stats.total += 1;
            match self.check(strategy, now).await {
                Ok(triggered) => {
                    stats.success += 1;
                    if triggered {
                        stats.triggered += 1;
                    }
                }
                Err(e) => {
                    stats.errors += 1;
                    warn!(
                        strategy_id = strategy.id,
                        stock_code = %strategy.stock_code,
                        error = %e,
                        "전략 평가 실패, 건너뜀"
                    );
                }
            }
        }

        let outcome = self
            .batcher
            .flush(self.sender.as_ref(), now.with_timezone(&self.timezone))
            .await;
        stats.notified = outcome.delivered();
        stats.elapsed = start.elapsed();

        Ok(stats)
    }

    /// 전략 1건 평가. 트리거되어 요약이 추가되면 `true`.
    async fn check(&mut self, strategy: &AlertStrategy, now: chrono::DateTime<chrono::Utc>) -> Result<bool> {
        if !self.evaluator.evaluate(strategy, now).await? {
            return Ok(false);
        }

        let tick = self
            .store
            .latest_tick(&strategy.stock_code)
            .await
            .map_err(|e| CollectorError::query(format!("strategy {}", strategy.id), e))?;

        match tick {
            Some(tick) => {
                info!(
                    strategy_id = strategy.id,
                    stock_code = %strategy.stock_code,
                    operator = %strategy.operator,
                    threshold = %strategy.threshold,
                    current = %tick.current,
                    "알림 조건 충족"
                );
                self.batcher.add_summary(&tick);
                Ok(true)
            }
            None => {
                warn!(
                    strategy_id = strategy.id,
                    stock_code = %strategy.stock_code,
                    "조건은 충족했으나 최신 시세 없음"
                );
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl SchedulerTask for WatchdogCycle {
    fn name(&self) -> &str {
        "watchdog"
    }

    async fn run(&mut self) -> Result<()> {
        let stats = self.watch().await?;
        if stats.triggered > 0 || stats.errors > 0 {
            stats.log_summary("watchdog");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::Mutex;
    use stock_core::{AlertOperator, QueryTable, StockTick, StoreError};
    use stock_notification::NotificationResult;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 1, 2, 2, 20, 0).unwrap()
        }
    }

    struct FailingRepository;

    #[async_trait]
    impl AlertStrategyRepository for FailingRepository {
        async fn list_enabled(&self) -> std::result::Result<Vec<AlertStrategy>, StoreError> {
            Err(StoreError::Database("connection refused".to_string()))
        }
    }

    struct StaticRepository(Vec<AlertStrategy>);

    #[async_trait]
    impl AlertStrategyRepository for StaticRepository {
        async fn list_enabled(&self) -> std::result::Result<Vec<AlertStrategy>, StoreError> {
            Ok(self.0.clone())
        }
    }

    /// 모든 쿼리에 같은 값을 돌려주는 저장소 (최신 시세 조회 포함)
    struct ConstantStore;

    #[async_trait]
    impl TimeSeriesStore for ConstantStore {
        async fn query(&self, _query: &str) -> std::result::Result<QueryTable, StoreError> {
            Ok(QueryTable::new(
                vec!["time".into(), "code".into(), "current".into()],
                vec![vec![json!("2024-01-02T02:19:57Z"), json!("SZ.000001"), json!(12)]],
            ))
        }

        async fn write_ticks(
            &self,
            ticks: &[StockTick],
        ) -> std::result::Result<usize, StoreError> {
            Ok(ticks.len())
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, message: &str) -> NotificationResult<()> {
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }

        fn is_enabled(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn cycle(
        repository: Arc<dyn AlertStrategyRepository>,
        sender: Arc<RecordingSender>,
    ) -> WatchdogCycle {
        WatchdogCycle::new(
            repository,
            Arc::new(ConstantStore),
            sender,
            Arc::new(FixedClock),
            chrono::Duration::minutes(5),
        )
    }

    #[tokio::test]
    async fn test_repository_failure_skips_flush() {
        let sender = Arc::new(RecordingSender::default());
        let mut watchdog = cycle(Arc::new(FailingRepository), sender.clone());

        let err = watchdog.run().await.unwrap_err();
        assert!(matches!(err, CollectorError::Query { .. }));
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_strategy_ignored() {
        let sender = Arc::new(RecordingSender::default());
        let strategies = vec![AlertStrategy::new(
            1,
            "SZ.000001",
            "SELECT current FROM stock_ticks",
            AlertOperator::Gt,
            dec!(10),
        )
        .with_enabled(false)];
        let mut watchdog = cycle(Arc::new(StaticRepository(strategies)), sender.clone());

        let stats = watchdog.watch().await.unwrap();
        assert_eq!(stats.total, 0);
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_header_uses_timezone() {
        let sender = Arc::new(RecordingSender::default());
        let strategies = vec![AlertStrategy::new(
            1,
            "SZ.000001",
            "SELECT current FROM stock_ticks",
            AlertOperator::Gt,
            dec!(10),
        )];
        let mut watchdog = cycle(Arc::new(StaticRepository(strategies)), sender.clone());

        let stats = watchdog.watch().await.unwrap();
        assert_eq!(stats.triggered, 1);
        assert_eq!(stats.notified, 1);

        // 02:20 UTC = 10:20 상하이
        let sent = sender.sent.lock().unwrap();
        assert!(sent[0].starts_with("2024-01-02 10:20:00\n\n"));
    }
}
