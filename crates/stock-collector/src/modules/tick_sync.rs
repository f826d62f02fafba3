//! 실시간 시세 동기화 모듈.
//!
//! 벤더 시세 클라이언트에서 종목 묶음의 최신 시세를 받아
//! 시계열 저장소에 기록합니다. 데몬의 틱마다 한 번 실행됩니다.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use stock_core::{MarketType, QuoteClient, TimeSeriesStore};
use tracing::{debug, warn};

use crate::error::CollectorError;
use crate::modules::daemon::SchedulerTask;
use crate::stats::CycleStats;
use crate::Result;

/// 시세 동기화 태스크.
pub struct TickSynchronizer {
    name: String,
    client: Arc<dyn QuoteClient>,
    store: Arc<dyn TimeSeriesStore>,
    codes: Vec<String>,
}

impl TickSynchronizer {
    pub fn new(
        client: Arc<dyn QuoteClient>,
        store: Arc<dyn TimeSeriesStore>,
        codes: Vec<String>,
    ) -> Self {
        Self {
            name: format!("tick_sync:{}", client.name()),
            client,
            store,
            codes,
        }
    }

    /// 지정 시장의 종목만 골라 생성.
    pub fn for_market(
        client: Arc<dyn QuoteClient>,
        store: Arc<dyn TimeSeriesStore>,
        codes: &[String],
        market: MarketType,
    ) -> Self {
        let codes = codes
            .iter()
            .filter(|code| MarketType::detect(code) == market)
            .cloned()
            .collect();
        let mut sync = Self::new(client, store, codes);
        sync.name = format!("{}:{}", sync.name, market);
        sync
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// 시세 1회 동기화.
    pub async fn synchronize(&self) -> Result<CycleStats> {
        let start = Instant::now();
        let mut stats = CycleStats::new();

        if self.codes.is_empty() {
            debug!(task = %self.name, "동기화 대상 종목 없음");
            return Ok(stats);
        }

        let ticks = self
            .client
            .fetch_ticks(&self.codes)
            .await
            .map_err(|e| CollectorError::query(format!("quote {}", self.client.name()), e))?;

        stats.total = self.codes.len();
        if ticks.len() < self.codes.len() {
            warn!(
                task = %self.name,
                requested = self.codes.len(),
                received = ticks.len(),
                "일부 종목 시세 누락"
            );
        }

        let written = self
            .store
            .write_ticks(&ticks)
            .await
            .map_err(|e| CollectorError::query("tick write", e))?;

        stats.success = written;
        stats.errors = stats.total.saturating_sub(written);
        stats.elapsed = start.elapsed();
        Ok(stats)
    }
}

/// 상하이/선전 시장별 동기화 태스크 구성.
///
/// 대상 종목이 없는 시장은 건너뛰고, 본토 이외 종목은 경고만 남깁니다.
pub fn mainland_synchronizers(
    client: Arc<dyn QuoteClient>,
    store: Arc<dyn TimeSeriesStore>,
    codes: &[String],
) -> Vec<TickSynchronizer> {
    let skipped: Vec<&String> = codes
        .iter()
        .filter(|code| !MarketType::detect(code).is_mainland())
        .collect();
    if !skipped.is_empty() {
        warn!(count = skipped.len(), codes = ?skipped, "시세 클라이언트 미지원 종목 제외");
    }

    [MarketType::Sh, MarketType::Sz]
        .into_iter()
        .map(|market| TickSynchronizer::for_market(client.clone(), store.clone(), codes, market))
        .filter(|sync| !sync.codes().is_empty())
        .collect()
}

#[async_trait]
impl SchedulerTask for TickSynchronizer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&mut self) -> Result<()> {
        let stats = self.synchronize().await?;
        if stats.total > 0 {
            stats.log_summary(&self.name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use stock_core::{QueryTable, StockTick, StoreError};

    struct FakeQuotes {
        fail: bool,
    }

    #[async_trait]
    impl QuoteClient for FakeQuotes {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch_ticks(
            &self,
            codes: &[String],
        ) -> std::result::Result<Vec<StockTick>, StoreError> {
            if self.fail {
                return Err(StoreError::Network("connection reset".to_string()));
            }
            let time = Utc.with_ymd_and_hms(2024, 1, 2, 2, 15, 3).unwrap();
            Ok(codes
                .iter()
                .map(|code| StockTick::new(code.clone(), time, dec!(10.5)))
                .collect())
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        written: Mutex<Vec<StockTick>>,
    }

    #[async_trait]
    impl TimeSeriesStore for MemoryStore {
        async fn query(&self, _query: &str) -> std::result::Result<QueryTable, StoreError> {
            Ok(QueryTable::empty())
        }

        async fn write_ticks(
            &self,
            ticks: &[StockTick],
        ) -> std::result::Result<usize, StoreError> {
            self.written.lock().unwrap().extend_from_slice(ticks);
            Ok(ticks.len())
        }
    }

    fn codes() -> Vec<String> {
        vec!["SZ.000001".into(), "SH.600000".into(), "HK.00700".into()]
    }

    #[tokio::test]
    async fn test_synchronize_writes_ticks() {
        let store = Arc::new(MemoryStore::default());
        let sync = TickSynchronizer::new(Arc::new(FakeQuotes { fail: false }), store.clone(), codes());

        let stats = sync.synchronize().await.unwrap();

        assert_eq!(stats.total, 3);
        assert_eq!(stats.success, 3);
        assert_eq!(store.written.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_for_market_filters_codes() {
        let store = Arc::new(MemoryStore::default());
        let mut sync = TickSynchronizer::for_market(
            Arc::new(FakeQuotes { fail: false }),
            store.clone(),
            &codes(),
            MarketType::Hk,
        );

        assert_eq!(sync.codes(), ["HK.00700".to_string()]);
        assert_eq!(sync.name(), "tick_sync:fake:HK");
        sync.run().await.unwrap();
        assert_eq!(store.written.lock().unwrap()[0].code, "HK.00700");
    }

    #[tokio::test]
    async fn test_quote_failure_is_query_error() {
        let store = Arc::new(MemoryStore::default());
        let mut sync =
            TickSynchronizer::new(Arc::new(FakeQuotes { fail: true }), store.clone(), codes());

        let err = sync.run().await.unwrap_err();
        assert!(matches!(err, CollectorError::Query { .. }));
        assert!(store.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_mainland_synchronizers() {
        let store: Arc<dyn TimeSeriesStore> = Arc::new(MemoryStore::default());
        let syncs = mainland_synchronizers(Arc::new(FakeQuotes { fail: false }), store.clone(), &codes());

        let names: Vec<&str> = syncs.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["tick_sync:fake:SH", "tick_sync:fake:SZ"]);
        assert_eq!(syncs[0].codes(), ["SH.600000".to_string()]);

        let hk_only = vec!["HK.00700".to_string()];
        assert!(mainland_synchronizers(Arc::new(FakeQuotes { fail: false }), store, &hk_only).is_empty());
    }

    #[tokio::test]
    async fn test_empty_codes_skipped() {
        let store = Arc::new(MemoryStore::default());
        let sync = TickSynchronizer::new(Arc::new(FakeQuotes { fail: true }), store, vec![]);
        assert_eq!(sync.synchronize().await.unwrap().total, 0);
    }
}
