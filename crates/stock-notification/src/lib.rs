//! 외부 알림 채널.
//!
//! 감시 사이클이 만든 메시지 한 건을 WeCom 등으로 전송합니다.

pub mod types;
pub mod wecom;

use async_trait::async_trait;
use tracing::warn;

pub use types::{NotificationError, NotificationResult, NotificationSender};
pub use wecom::{WeComConfig, WeComSender};

/// 여러 채널로 동시에 보내는 전송기.
///
/// 활성화된 채널 중 하나라도 성공하면 성공으로 간주합니다.
#[derive(Default)]
pub struct MultiSender {
    senders: Vec<Box<dyn NotificationSender>>,
}

impl MultiSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 채널 추가.
    pub fn with(mut self, sender: Box<dyn NotificationSender>) -> Self {
        self.senders.push(sender);
        self
    }

    /// 환경 변수에 설정된 채널로 구성.
    pub fn from_env() -> Self {
        let mut multi = Self::new();
        if let Some(wecom) = WeComSender::from_env() {
            multi = multi.with(Box::new(wecom));
        }
        multi
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[async_trait]
impl NotificationSender for MultiSender {
    async fn send(&self, message: &str) -> NotificationResult<()> {
        let mut delivered = false;
        let mut last_error = None;

        for sender in self.senders.iter().filter(|s| s.is_enabled()) {
            match sender.send(message).await {
                Ok(()) => delivered = true,
                Err(e) => {
                    warn!(channel = sender.name(), error = %e, "알림 채널 전송 실패");
                    last_error = Some(e);
                }
            }
        }

        match (delivered, last_error) {
            (true, _) | (false, None) => Ok(()),
            (false, Some(e)) => Err(e),
        }
    }

    fn is_enabled(&self) -> bool {
        self.senders.iter().any(|s| s.is_enabled())
    }

    fn name(&self) -> &str {
        "multi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubSender {
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl NotificationSender for StubSender {
        async fn send(&self, _message: &str) -> NotificationResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotificationError::SendFailed("boom".to_string()))
            } else {
                Ok(())
            }
        }

        fn is_enabled(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    #[tokio::test]
    async fn test_multi_sender_partial_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let multi = MultiSender::new()
            .with(Box::new(StubSender { fail: true, calls: calls.clone() }))
            .with(Box::new(StubSender { fail: false, calls: calls.clone() }));

        multi.send("alert").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_multi_sender_all_fail() {
        let calls = Arc::new(AtomicUsize::new(0));
        let multi = MultiSender::new().with(Box::new(StubSender { fail: true, calls }));
        assert!(multi.send("alert").await.is_err());
    }

    #[test]
    fn test_empty_multi_sender_disabled() {
        let multi = MultiSender::new();
        assert!(multi.is_empty());
        assert!(!multi.is_enabled());
    }
}
