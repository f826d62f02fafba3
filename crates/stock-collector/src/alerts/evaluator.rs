//! 알림 조건 평가기.
//!
//! 전략의 쿼리 템플릿을 렌더링해 시계열 저장소에 실행하고,
//! 결과 테이블의 모든 값 셀에 비교 연산을 적용해 OR로 합칩니다.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use rust_decimal::Decimal;
use stock_core::ports::escape_literal;
use stock_core::{cell_to_decimal, AlertOperator, AlertStrategy, QueryTable, StoreError, TimeSeriesStore};
use tracing::debug;

use crate::error::CollectorError;
use crate::Result;

/// 템플릿 변수
const VAR_STOCK_CODE: &str = "stock_code";
const VAR_WINDOW_START: &str = "window_start";
const VAR_FIVE_MINUTES: &str = "five_minutes";

/// 전략 평가기.
pub struct AlertEvaluator {
    store: Arc<dyn TimeSeriesStore>,
    lookback: chrono::Duration,
}

impl AlertEvaluator {
    pub fn new(store: Arc<dyn TimeSeriesStore>, lookback: chrono::Duration) -> Self {
        Self { store, lookback }
    }

    pub fn lookback(&self) -> chrono::Duration {
        self.lookback
    }

    /// 쿼리 윈도우 시작 시각 (초 단위 절삭, RFC 3339 `Z` 표기).
    pub fn window_start(&self, now: DateTime<Utc>) -> String {
        let start = now - self.lookback;
        let start = start.with_nanosecond(0).unwrap_or(start);
        start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// 템플릿 렌더링.
    pub fn render_query(&self, strategy: &AlertStrategy, now: DateTime<Utc>) -> Result<String> {
        let window_start = self.window_start(now);
        let stock_code = escape_literal(&strategy.stock_code);

        render_template(&strategy.query_template, |name| match name {
            VAR_STOCK_CODE => Some(stock_code.as_str()),
            VAR_WINDOW_START | VAR_FIVE_MINUTES => Some(window_start.as_str()),
            _ => None,
        })
        .map_err(|reason| {
            CollectorError::query(format!("strategy {}", strategy.id), StoreError::Query(reason))
        })
    }

    /// 전략 1건 평가. 임계값을 충족하는 셀이 하나라도 있으면 `true`.
    pub async fn evaluate(&self, strategy: &AlertStrategy, now: DateTime<Utc>) -> Result<bool> {
        let query = self.render_query(strategy, now)?;
        debug!(strategy_id = strategy.id, query = %query, "전략 쿼리 실행");

        let table = self
            .store
            .query(&query)
            .await
            .map_err(|e| CollectorError::query(format!("strategy {}", strategy.id), e))?;

        Ok(reduce_trigger(&table, strategy.operator, strategy.threshold))
    }
}

/// `{{ name }}` 치환. 알 수 없는 변수나 닫히지 않은 괄호는 에러.
fn render_template<'a, F>(template: &str, lookup: F) -> std::result::Result<String, String>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let close = after
            .find("}}")
            .ok_or_else(|| format!("닫히지 않은 템플릿 변수: {}", &rest[open..]))?;
        let name = after[..close].trim();
        let value = lookup(name).ok_or_else(|| format!("알 수 없는 템플릿 변수: {}", name))?;
        out.push_str(value);
        rest = &after[close + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

/// 결과 테이블의 값 셀(`time` 제외)에 연산자를 적용해 OR.
///
/// 숫자로 해석되지 않는 셀(null, bool, 일반 문자열)은 미충족으로 봅니다.
pub fn reduce_trigger(table: &QueryTable, operator: AlertOperator, threshold: Decimal) -> bool {
    table
        .value_cells()
        .filter_map(cell_to_decimal)
        .any(|value| operator.apply(value, threshold))
}
