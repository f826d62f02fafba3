//! 외부 협력자 포트.
//!
//! 스케줄러와 감시 사이클은 아래 trait만 의존합니다. 저장소 연결의 수명은
//! 호출자가 관리하며, 각 구현체는 생성 시점에 핸들을 주입받습니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AlertStrategy, QueryTable, StockTick};
use crate::StoreError;

// =============================================================================
// 시계열 저장소
// =============================================================================

/// 시계열 저장소 (InfluxDB 등).
///
/// # 구현 예시
///
/// ```ignore
/// pub struct InfluxClient { /* ... */ }
///
/// #[async_trait]
/// impl TimeSeriesStore for InfluxClient {
///     async fn query(&self, query: &str) -> Result<QueryTable, StoreError> {
///         // HTTP /query 호출 및 결과 변환
///     }
///
///     async fn write_ticks(&self, ticks: &[StockTick]) -> Result<usize, StoreError> {
///         // line protocol 변환 후 /write 호출
///     }
/// }
/// ```
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// 쿼리 실행. 결과가 없으면 빈 테이블을 반환합니다.
    async fn query(&self, query: &str) -> Result<QueryTable, StoreError>;

    /// 시세 기록. 기록된 건수를 반환합니다.
    async fn write_ticks(&self, ticks: &[StockTick]) -> Result<usize, StoreError>;

    /// 종목의 가장 최근 시세 조회.
    async fn latest_tick(&self, code: &str) -> Result<Option<StockTick>, StoreError> {
        let query = format!(
            "SELECT * FROM stock_ticks WHERE code = '{}' ORDER BY time DESC LIMIT 1",
            escape_literal(code)
        );
        let table = self.query(&query).await?;
        if table.is_empty() {
            return Ok(None);
        }
        StockTick::from_row(&table, 0).map(Some)
    }
}

/// InfluxQL 문자열 리터럴 이스케이프.
pub fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

// =============================================================================
// 관계형 저장소
// =============================================================================

/// 알림 전략 조회.
#[async_trait]
pub trait AlertStrategyRepository: Send + Sync {
    /// 활성화된 전략 목록 (id 순).
    async fn list_enabled(&self) -> Result<Vec<AlertStrategy>, StoreError>;
}

// =============================================================================
// 시세 클라이언트
// =============================================================================

/// 벤더 실시간 시세 클라이언트.
#[async_trait]
pub trait QuoteClient: Send + Sync {
    /// 클라이언트 이름 (로그용)
    fn name(&self) -> &str;

    /// 종목 목록의 실시간 시세 일괄 조회.
    async fn fetch_ticks(&self, codes: &[String]) -> Result<Vec<StockTick>, StoreError>;
}

// =============================================================================
// 시계
// =============================================================================

/// 현재 시각 제공자.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 시스템 벽시계.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingStore {
        table: QueryTable,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TimeSeriesStore for RecordingStore {
        async fn query(&self, query: &str) -> Result<QueryTable, StoreError> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.table.clone())
        }

        async fn write_ticks(&self, ticks: &[StockTick]) -> Result<usize, StoreError> {
            Ok(ticks.len())
        }
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal("SZ.000001"), "SZ.000001");
        assert_eq!(escape_literal("a'b"), "a\\'b");
    }

    #[tokio::test]
    async fn test_latest_tick_default() {
        let store = RecordingStore {
            table: QueryTable::new(
                vec!["time".into(), "code".into(), "current".into()],
                vec![vec![json!("2024-01-02T02:15:03Z"), json!("SZ.000001"), json!(10.5)]],
            ),
            queries: Mutex::new(Vec::new()),
        };

        let tick = store.latest_tick("SZ.000001").await.unwrap().unwrap();
        assert_eq!(tick.code, "SZ.000001");

        let queries = store.queries.lock().unwrap();
        assert_eq!(
            queries[0],
            "SELECT * FROM stock_ticks WHERE code = 'SZ.000001' ORDER BY time DESC LIMIT 1"
        );
    }

    #[tokio::test]
    async fn test_latest_tick_empty() {
        let store = RecordingStore {
            table: QueryTable::empty(),
            queries: Mutex::new(Vec::new()),
        };
        assert!(store.latest_tick("SZ.000002").await.unwrap().is_none());
    }
}
