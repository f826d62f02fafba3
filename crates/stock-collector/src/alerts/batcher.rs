//! 알림 배치.
//!
//! 한 사이클 동안 트리거된 종목 요약을 모아 두었다가
//! 사이클 끝에 메시지 한 건으로 보냅니다.

use chrono::DateTime;
use chrono_tz::Tz;
use stock_core::StockTick;
use stock_notification::NotificationSender;
use tracing::{error, info, warn};

use crate::error::CollectorError;

/// `flush` 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// 보낼 요약이 없어 전송하지 않음
    Empty,
    /// 전송 성공
    Sent { count: usize },
    /// 활성화된 채널이 없어 전송하지 않음 (배치는 비워짐)
    Skipped { count: usize },
    /// 전송 실패 (재시도 없음, 배치는 비워짐)
    Failed { count: usize, error: String },
}

impl FlushOutcome {
    /// 메시지에 포함된 요약 수 (전송 성공 시)
    pub fn delivered(&self) -> usize {
        match self {
            FlushOutcome::Sent { count } => *count,
            _ => 0,
        }
    }
}

/// 요약 모음.
#[derive(Debug, Default)]
pub struct NotificationBatcher {
    batch: Vec<String>,
}

impl NotificationBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 시세 요약 블록 렌더링.
    pub fn render_summary(tick: &StockTick) -> String {
        let title = match &tick.name {
            Some(name) => format!("{}-{}", tick.code, name),
            None => tick.code.clone(),
        };
        format!(
            "# 종목코드: {}\n## 현재가: <font color=\"warning\">{}</font>\n## 매수/매도 잔량: {}",
            title,
            tick.current,
            tick.bid_vs_ask()
        )
    }

    /// 요약 추가.
    pub fn add_summary(&mut self, tick: &StockTick) {
        self.batch.push(Self::render_summary(tick));
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// 모인 요약을 메시지 한 건으로 전송하고 배치를 비움.
    ///
    /// 메시지는 `%Y-%m-%d %H:%M:%S` 헤더 뒤에 요약을 빈 줄로 이어 붙입니다.
    pub async fn flush(&mut self, sender: &dyn NotificationSender, now: DateTime<Tz>) -> FlushOutcome {
        if self.batch.is_empty() {
            return FlushOutcome::Empty;
        }

        let summaries = std::mem::take(&mut self.batch);
        let count = summaries.len();
        if !sender.is_enabled() {
            warn!(channel = sender.name(), count, "알림 채널 비활성화, 전송 생략");
            return FlushOutcome::Skipped { count };
        }

        let message = format!(
            "{}\n\n{}",
            now.format("%Y-%m-%d %H:%M:%S"),
            summaries.join("\n\n")
        );

        match sender.send(&message).await {
            Ok(()) => {
                info!(channel = sender.name(), count, "알림 전송 완료");
                FlushOutcome::Sent { count }
            }
            Err(e) => {
                let err = CollectorError::from(e);
                error!(channel = sender.name(), count, error = %err, "알림 전송 실패");
                FlushOutcome::Failed {
                    count,
                    error: err.to_string(),
                }
            }
        }
    }
}
