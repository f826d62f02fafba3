//! 종목 코드 기반 시장 판별.

use serde::{Deserialize, Serialize};

/// 상장 시장.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketType {
    /// 상하이
    Sh,
    /// 선전
    Sz,
    /// 홍콩
    Hk,
    /// 미국
    Us,
    Unknown,
}

impl MarketType {
    /// 종목 코드에서 시장을 판별.
    ///
    /// `SH.600000`, `SZ.000001`, `HK.00700`, `US.AAPL` 접두사와
    /// `600000.XSHG`, `000001.XSHE` 접미사 형식을 지원합니다.
    pub fn detect(code: &str) -> Self {
        let code = code.trim().to_uppercase();
        if code.starts_with("HK.") {
            MarketType::Hk
        } else if code.starts_with("SZ.") || code.ends_with(".XSHE") {
            MarketType::Sz
        } else if code.starts_with("SH.") || code.ends_with(".XSHG") {
            MarketType::Sh
        } else if code.starts_with("US.") {
            MarketType::Us
        } else {
            MarketType::Unknown
        }
    }

    /// 중국 본토 A주 시장 여부
    pub fn is_mainland(self) -> bool {
        matches!(self, MarketType::Sh | MarketType::Sz)
    }
}

impl std::fmt::Display for MarketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketType::Sh => write!(f, "SH"),
            MarketType::Sz => write!(f, "SZ"),
            MarketType::Hk => write!(f, "HK"),
            MarketType::Us => write!(f, "US"),
            MarketType::Unknown => write!(f, "N/A"),
        }
    }
}
