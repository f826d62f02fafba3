//! 환경변수 기반 설정 모듈.

use std::time::Duration;

use chrono_tz::Tz;
use stock_data::InfluxConfig;

use crate::error::CollectorError;
pub use crate::modules::calendar::DEFAULT_TRADING_SESSIONS;
use crate::modules::calendar::{parse_sessions, TradingCalendar, TradingSession};
use crate::Result;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL
    pub database_url: String,
    /// InfluxDB 설정
    pub influx: InfluxConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
    /// 거래 시간 설정
    pub trading: TradingConfig,
    /// 알림 감시 설정
    pub alert: AlertConfig,
    /// 시세 동기화 설정
    pub sync: SyncConfig,
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 틱 최소 간격 (초)
    pub min_tick_seconds: u64,
    /// 장외 시간 재확인 간격 (초)
    pub closed_idle_seconds: u64,
}

/// 거래 시간 설정
#[derive(Debug, Clone)]
pub struct TradingConfig {
    pub sessions: Vec<TradingSession>,
    pub timezone: Tz,
}

/// 알림 감시 설정
#[derive(Debug, Clone)]
pub struct AlertConfig {
    /// 감시 태스크 등록 여부
    pub enabled: bool,
    /// 쿼리 윈도우 길이 (분)
    pub lookback_minutes: i64,
}

/// 시세 동기화 설정
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// 동기화 대상 종목 코드 (예: SZ.000001)
    pub codes: Vec<String>,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            CollectorError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
        })?;

        let mut influx = InfluxConfig::new(
            env_var_or("INFLUXDB_URL", "http://localhost:8086"),
            env_var_or("INFLUXDB_DATABASE", "stock"),
        );
        if let (Ok(username), Ok(password)) = (
            std::env::var("INFLUXDB_USERNAME"),
            std::env::var("INFLUXDB_PASSWORD"),
        ) {
            influx = influx.with_credentials(username, password);
        }

        let trading = TradingConfig::parse(
            &env_var_or("TRADING_SESSIONS", DEFAULT_TRADING_SESSIONS),
            &env_var_or("TRADING_TIMEZONE", "Asia/Shanghai"),
        )?;

        Ok(Self {
            database_url,
            influx,
            daemon: DaemonConfig {
                min_tick_seconds: env_var_parse("DAEMON_MIN_TICK_SECONDS", 3)?,
                closed_idle_seconds: env_var_parse("DAEMON_CLOSED_IDLE_SECONDS", 30)?,
            },
            trading,
            alert: AlertConfig::new(
                env_var_bool("ALERT_ENABLED", true),
                env_var_parse("ALERT_LOOKBACK_MINUTES", 5)?,
            )?,
            sync: SyncConfig::parse(&env_var_or("SYNC_STOCK_CODES", "")),
        })
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            min_tick_seconds: 3,
            closed_idle_seconds: 30,
        }
    }
}

impl DaemonConfig {
    /// 틱 최소 간격을 Duration으로 반환
    pub fn min_tick(&self) -> Duration {
        Duration::from_secs(self.min_tick_seconds)
    }

    /// 장외 대기 간격을 Duration으로 반환
    pub fn closed_idle(&self) -> Duration {
        Duration::from_secs(self.closed_idle_seconds)
    }
}

impl TradingConfig {
    /// 세션 문자열과 타임존 이름 파싱
    pub fn parse(sessions: &str, timezone: &str) -> Result<Self> {
        let sessions = parse_sessions(sessions)?;
        let timezone: Tz = timezone
            .trim()
            .parse()
            .map_err(|_| CollectorError::Config(format!("알 수 없는 타임존: {}", timezone)))?;
        Ok(Self { sessions, timezone })
    }

    /// 캘린더 생성
    pub fn calendar(&self) -> Result<TradingCalendar> {
        TradingCalendar::new(self.sessions.clone(), self.timezone)
    }
}

impl AlertConfig {
    /// 설정 생성. 윈도우 길이는 양수여야 합니다.
    pub fn new(enabled: bool, lookback_minutes: i64) -> Result<Self> {
        if lookback_minutes <= 0 {
            return Err(CollectorError::Config(format!(
                "ALERT_LOOKBACK_MINUTES는 양수여야 합니다: {}",
                lookback_minutes
            )));
        }
        Ok(Self {
            enabled,
            lookback_minutes,
        })
    }

    /// 쿼리 윈도우 길이
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lookback_minutes)
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback_minutes: 5,
        }
    }
}

impl SyncConfig {
    /// 쉼표로 구분된 종목 코드 목록 파싱
    pub fn parse(codes: &str) -> Self {
        Self {
            codes: codes
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// 환경변수에서 값을 파싱 (미설정 시 기본값, 형식 오류는 설정 에러)
fn env_var_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_var(key, std::env::var(key).ok(), default)
}

fn parse_var<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e| {
            CollectorError::Config(format!("{} 값이 올바르지 않습니다 ({}): {}", key, v, e))
        }),
    }
}

/// 환경변수 문자열 (미설정 시 기본값)
fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}
