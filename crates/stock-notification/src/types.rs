//! 알림 전송 공통 타입.

use async_trait::async_trait;
use thiserror::Error;

/// 알림 전송 에러.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// 수신 측이 전송을 거부함
    #[error("전송 실패: {0}")]
    SendFailed(String),

    /// 요청 한도 초과 (재시도 대기 초)
    #[error("요청 한도 초과, {0}초 후 재시도 가능")]
    RateLimited(u64),

    /// 설정 오류
    #[error("설정 오류: {0}")]
    InvalidConfig(String),
}

pub type NotificationResult<T> = Result<T, NotificationError>;

/// 외부 알림 채널.
///
/// 호출자 입장에서는 fire-and-forget이며 재시도는 하지 않습니다.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 완성된 메시지 본문 전송.
    async fn send(&self, message: &str) -> NotificationResult<()>;

    /// 전송 활성화 여부
    fn is_enabled(&self) -> bool;

    /// 채널 이름 (로그용)
    fn name(&self) -> &str;
}
