//! 알림 전략 Repository (PostgreSQL).

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use stock_core::{AlertOperator, AlertStrategy, AlertStrategyRepository, StoreError};
use tracing::{debug, warn};

/// `alert_strategy` 테이블 레코드.
#[derive(Debug, Clone, FromRow)]
pub struct AlertStrategyRecord {
    pub id: i64,
    pub stock_code: String,
    pub enabled: bool,
    pub query_template: String,
    pub threshold: Decimal,
    pub operator: String,
}

impl AlertStrategyRecord {
    /// 도메인 객체로 변환. 알 수 없는 연산자는 에러.
    pub fn into_strategy(self) -> Result<AlertStrategy, StoreError> {
        let operator: AlertOperator = self
            .operator
            .parse()
            .map_err(|e: String| StoreError::Parse(format!("strategy {}: {}", self.id, e)))?;

        Ok(AlertStrategy {
            id: self.id,
            stock_code: self.stock_code,
            enabled: self.enabled,
            query_template: self.query_template,
            threshold: self.threshold,
            operator,
        })
    }
}

/// PostgreSQL 기반 전략 조회.
#[derive(Clone)]
pub struct PgAlertStrategyRepository {
    pool: PgPool,
}

impl PgAlertStrategyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStrategyRepository for PgAlertStrategyRepository {
    async fn list_enabled(&self) -> Result<Vec<AlertStrategy>, StoreError> {
        let records: Vec<AlertStrategyRecord> = sqlx::query_as(
            r#"
            SELECT id, stock_code, enabled, query_template, threshold, operator
            FROM alert_strategy
            WHERE enabled = true
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        debug!(count = records.len(), "활성 알림 전략 조회");

        // 연산자가 잘못된 행은 해당 전략만 제외
        let strategies = records
            .into_iter()
            .filter_map(|record| match record.into_strategy() {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!(error = %e, "알림 전략 디코딩 실패, 건너뜀");
                    None
                }
            })
            .collect();

        Ok(strategies)
    }
}
