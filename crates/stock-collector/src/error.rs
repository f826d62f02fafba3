//! 에러 타입 정의.

use std::fmt;

use stock_core::StoreError;
use stock_notification::NotificationError;

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 시계열/관계형 쿼리 실행 실패 (전략 단위로 복구)
    Query { context: String, source: StoreError },
    /// 스케줄러 태스크 실패 (틱 단위로 복구)
    Task { task: String, reason: String },
    /// 알림 전송 실패 (배치는 비워짐, 재시도 없음)
    Notification(NotificationError),
    /// 설정 에러 (시작 불가)
    Config(String),
}

impl CollectorError {
    /// 컨텍스트를 붙인 쿼리 에러 생성
    pub fn query(context: impl Into<String>, source: StoreError) -> Self {
        Self::Query {
            context: context.into(),
            source,
        }
    }

    /// 시작을 막아야 하는 에러인지 여부
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query { context, source } => write!(f, "Query error [{}]: {}", context, source),
            Self::Task { task, reason } => write!(f, "Task error [{}]: {}", task, reason),
            Self::Notification(e) => write!(f, "Notification error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CollectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Query { source, .. } => Some(source),
            Self::Notification(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for CollectorError {
    fn from(err: StoreError) -> Self {
        Self::query("store", err)
    }
}

impl From<NotificationError> for CollectorError {
    fn from(err: NotificationError) -> Self {
        Self::Notification(err)
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
