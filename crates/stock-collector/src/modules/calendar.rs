//! 거래 시간대 캘린더.
//!
//! 현지 시각(time-of-day)만 보고 장중 여부를 판단합니다.
//! 주말/공휴일 제외는 이 모듈의 책임이 아닙니다.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::error::CollectorError;
use crate::Result;

/// 기본 거래 세션 (상하이/선전)
pub const DEFAULT_TRADING_SESSIONS: &str = "08:45-11:31,12:59-15:01";

/// 거래 세션 하나 (`open`, `close` 모두 포함).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingSession {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl TradingSession {
    /// 세션 생성. `open > close`면 설정 에러.
    pub fn new(open: NaiveTime, close: NaiveTime) -> Result<Self> {
        if open > close {
            return Err(CollectorError::Config(format!(
                "거래 세션 시작({})이 종료({})보다 늦습니다",
                open, close
            )));
        }
        Ok(Self { open, close })
    }

    /// 경계 포함 여부
    pub fn contains(&self, now: NaiveTime) -> bool {
        self.open <= now && now <= self.close
    }
}

impl std::fmt::Display for TradingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.open.format("%H:%M"), self.close.format("%H:%M"))
    }
}

impl std::str::FromStr for TradingSession {
    type Err = CollectorError;

    /// `"08:45-11:31"` 또는 `"08:45:00-11:31:00"` 형식.
    fn from_str(s: &str) -> Result<Self> {
        let (open, close) = s
            .split_once('-')
            .ok_or_else(|| CollectorError::Config(format!("잘못된 거래 세션 형식: {}", s)))?;
        Self::new(parse_time(open)?, parse_time(close)?)
    }
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| CollectorError::Config(format!("잘못된 시각 형식: {}", s)))
}

/// 쉼표로 구분된 세션 목록 파싱 (예: `"08:45-11:31,12:59-15:01"`).
pub fn parse_sessions(s: &str) -> Result<Vec<TradingSession>> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

/// 장중 판별 캘린더.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    sessions: Vec<TradingSession>,
    timezone: Tz,
}

impl TradingCalendar {
    /// 캘린더 생성. 세션이 비어 있으면 설정 에러.
    pub fn new(sessions: Vec<TradingSession>, timezone: Tz) -> Result<Self> {
        if sessions.is_empty() {
            return Err(CollectorError::Config(
                "거래 세션이 하나 이상 필요합니다".to_string(),
            ));
        }
        Ok(Self { sessions, timezone })
    }

    /// 상하이/선전 기본 세션 (08:45-11:31, 12:59-15:01, Asia/Shanghai).
    ///
    /// 정규장 앞뒤로 1분 이상 여유를 둡니다.
    pub fn a_share() -> Result<Self> {
        Self::new(parse_sessions(DEFAULT_TRADING_SESSIONS)?, chrono_tz::Asia::Shanghai)
    }

    pub fn sessions(&self) -> &[TradingSession] {
        &self.sessions
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// 현지 시각 기준 장중 여부.
    pub fn is_open(&self, now: NaiveTime) -> bool {
        self.sessions.iter().any(|s| s.contains(now))
    }

    /// UTC 시각을 캘린더 타임존으로 변환해 장중 여부 판단.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.is_open(now.with_timezone(&self.timezone).time())
    }

    /// 다음 세션 시작까지 남은 시간 (장중이면 0).
    ///
    /// 오늘 남은 세션이 없으면 다음 날 첫 세션 기준입니다.
    pub fn until_next_open(&self, now: DateTime<Utc>) -> chrono::Duration {
        let local = now.with_timezone(&self.timezone).time();
        if self.is_open(local) {
            return chrono::Duration::zero();
        }

        let today = self
            .sessions
            .iter()
            .filter(|s| s.open > local)
            .map(|s| s.open.signed_duration_since(local))
            .min();

        today.unwrap_or_else(|| {
            let first_open = self.sessions.iter().map(|s| s.open).min().unwrap_or(local);
            chrono::Duration::days(1) - local.signed_duration_since(first_open)
        })
    }

    /// 캘린더 상태 요약
    pub fn status_summary(&self, now: DateTime<Utc>) -> String {
        let local = now.with_timezone(&self.timezone);
        let sessions = self
            .sessions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let status = if self.is_open(local.time()) {
            "장중".to_string()
        } else {
            format!(
                "장외 (다음 개장까지 {}분)",
                self.until_next_open(now).num_minutes()
            )
        };

        format!(
            "=== 거래 캘린더 ===\n세션: {} ({})\n현지시간: {}\n상태: {}",
            sessions,
            self.timezone,
            local.format("%H:%M:%S"),
            status
        )
    }
}
