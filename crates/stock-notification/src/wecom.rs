//! 기업위챗(WeCom) 알림 서비스.
//!
//! WeCom 그룹 봇/앱 webhook으로 markdown 메시지를 전송합니다.

use crate::types::{NotificationError, NotificationResult, NotificationSender};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error, info, warn};

/// WeCom 알림 전송 설정.
#[derive(Debug, Clone)]
pub struct WeComConfig {
    /// Webhook URL
    pub webhook_url: String,
    /// 대상 채팅방 ID
    pub chat_id: Option<String>,
    /// 전송 활성화 여부
    pub enabled: bool,
}

impl WeComConfig {
    /// 새 WeCom 설정을 생성합니다.
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            chat_id: None,
            enabled: true,
        }
    }

    /// 채팅방 ID를 설정합니다.
    pub fn with_chat_id(mut self, chat_id: String) -> Self {
        self.chat_id = Some(chat_id);
        self
    }

    /// 환경 변수에서 설정을 생성합니다.
    pub fn from_env() -> Option<Self> {
        let webhook_url = std::env::var("WECOM_NOTIFY_URL").ok()?;
        let chat_id = std::env::var("WECOM_CHAT_ID").ok();
        let enabled = std::env::var("WECOM_ENABLED")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);

        Some(Self {
            webhook_url,
            chat_id,
            enabled,
        })
    }
}

/// WeCom 알림 전송기.
pub struct WeComSender {
    config: WeComConfig,
    client: reqwest::Client,
}

impl WeComSender {
    /// 새 WeCom 전송기를 생성합니다.
    pub fn new(config: WeComConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// 환경 변수에서 전송기를 생성합니다.
    pub fn from_env() -> Option<Self> {
        WeComConfig::from_env().map(Self::new)
    }

    /// markdown 메시지 페이로드.
    fn format_payload(&self, message: &str) -> serde_json::Value {
        let mut payload = json!({
            "msgtype": "markdown",
            "markdown": { "content": message }
        });
        if let Some(chat_id) = &self.config.chat_id {
            payload["chatid"] = json!(chat_id);
        }
        payload
    }

    async fn send_webhook(&self, payload: serde_json::Value) -> NotificationResult<()> {
        debug!("Sending WeCom webhook message");

        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(NotificationError::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                warn!("WeCom rate limited");
                return Err(NotificationError::RateLimited(60));
            }
            error!("WeCom webhook 전송 실패: {} - {}", status, body);
            return Err(NotificationError::SendFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        // WeCom은 HTTP 200 + {"errcode": N} 으로 실패를 알림
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        match body.get("errcode").and_then(|c| c.as_i64()) {
            None | Some(0) => {
                info!("WeCom 알림 전송 완료");
                Ok(())
            }
            Some(45009) => {
                warn!("WeCom rate limited");
                Err(NotificationError::RateLimited(60))
            }
            Some(code) => {
                let msg = body
                    .get("errmsg")
                    .and_then(|m| m.as_str())
                    .unwrap_or_default();
                error!("WeCom webhook 전송 실패: errcode={} {}", code, msg);
                Err(NotificationError::SendFailed(format!(
                    "errcode {}: {}",
                    code, msg
                )))
            }
        }
    }
}

#[async_trait]
impl NotificationSender for WeComSender {
    async fn send(&self, message: &str) -> NotificationResult<()> {
        if !self.is_enabled() {
            debug!("WeCom 알림이 비활성화되어 있습니다");
            return Ok(());
        }

        let payload = self.format_payload(message);
        self.send_webhook(payload).await
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.webhook_url.is_empty()
    }

    fn name(&self) -> &str {
        "wecom"
    }
}
