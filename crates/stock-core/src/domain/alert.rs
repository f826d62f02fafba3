//! 임계값 알림 전략.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 임계값 비교 연산자.
///
/// 문자열 매핑이 아닌 닫힌 열거형이므로 평가 시점에 알 수 없는 연산자가
/// 등장할 수 없습니다. 알 수 없는 문자열은 행 디코딩 단계에서 거부됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl AlertOperator {
    /// 모든 연산자 목록
    pub const ALL: [AlertOperator; 6] = [
        AlertOperator::Eq,
        AlertOperator::Ne,
        AlertOperator::Gt,
        AlertOperator::Ge,
        AlertOperator::Lt,
        AlertOperator::Le,
    ];

    /// `lhs <op> rhs` 평가.
    pub fn apply(self, lhs: Decimal, rhs: Decimal) -> bool {
        match self {
            AlertOperator::Eq => lhs == rhs,
            AlertOperator::Ne => lhs != rhs,
            AlertOperator::Gt => lhs > rhs,
            AlertOperator::Ge => lhs >= rhs,
            AlertOperator::Lt => lhs < rhs,
            AlertOperator::Le => lhs <= rhs,
        }
    }

    /// 연산자 기호
    pub fn symbol(self) -> &'static str {
        match self {
            AlertOperator::Eq => "==",
            AlertOperator::Ne => "!=",
            AlertOperator::Gt => ">",
            AlertOperator::Ge => ">=",
            AlertOperator::Lt => "<",
            AlertOperator::Le => "<=",
        }
    }
}

impl std::fmt::Display for AlertOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl std::str::FromStr for AlertOperator {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "==" => Ok(AlertOperator::Eq),
            "!=" => Ok(AlertOperator::Ne),
            ">" => Ok(AlertOperator::Gt),
            ">=" => Ok(AlertOperator::Ge),
            "<" => Ok(AlertOperator::Lt),
            "<=" => Ok(AlertOperator::Le),
            _ => Err(format!("Invalid alert operator: {}", s)),
        }
    }
}

/// 영속화된 알림 전략.
///
/// 외부 도구에서 생성/수정되며 감시 사이클마다 새로 조회합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertStrategy {
    pub id: i64,
    /// 감시 대상 종목 코드 (예: "SZ.000001")
    pub stock_code: String,
    /// 비활성 전략은 평가하지 않음
    pub enabled: bool,
    /// 시계열 쿼리 템플릿.
    ///
    /// `{{ stock_code }}`, `{{ window_start }}` (`{{ five_minutes }}` 별칭) 치환을 지원합니다.
    pub query_template: String,
    /// 비교 기준값
    pub threshold: Decimal,
    /// 비교 연산자
    pub operator: AlertOperator,
}

impl AlertStrategy {
    /// 새 전략 생성 (활성 상태).
    pub fn new(
        id: i64,
        stock_code: impl Into<String>,
        query_template: impl Into<String>,
        operator: AlertOperator,
        threshold: Decimal,
    ) -> Self {
        Self {
            id,
            stock_code: stock_code.into(),
            enabled: true,
            query_template: query_template.into(),
            threshold,
            operator,
        }
    }

    /// 활성화 여부 설정.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
