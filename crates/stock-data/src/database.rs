//! PostgreSQL 연결 풀.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use stock_core::StoreError;
use tracing::info;

/// 연결 풀 설정.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
}

impl DatabaseConfig {
    /// 단일 루프 데몬용 설정.
    ///
    /// 태스크가 한 번에 하나씩 실행되므로 작은 풀로 충분합니다.
    pub fn for_daemon(url: String) -> Self {
        Self {
            url,
            max_connections: 2,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// 프로세스 전역에서 공유하는 DB 핸들.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 연결 풀 생성.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "데이터베이스 연결 풀 생성 완료"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 내장 마이그레이션 적용 (`migrations/`).
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        info!("마이그레이션 적용 완료");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_daemon() {
        let config = DatabaseConfig::for_daemon("postgres://localhost/stock".to_string());
        assert_eq!(config.max_connections, 2);
        assert!(config.min_connections <= config.max_connections);
    }
}
