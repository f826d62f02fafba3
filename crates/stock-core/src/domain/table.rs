//! 시계열 쿼리 결과 테이블.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 인덱스로 취급되어 값 비교에서 제외되는 컬럼.
pub const TIME_COLUMN: &str = "time";

/// 컬럼 이름이 붙은 행 집합. 비어 있을 수 있습니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// 빈 결과
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 컬럼 위치 조회
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// 특정 행/컬럼 셀 조회
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// `time` 컬럼을 제외한 모든 셀 순회.
    pub fn value_cells(&self) -> impl Iterator<Item = &Value> + '_ {
        let time_idx = self.column_index(TIME_COLUMN);
        self.rows.iter().flat_map(move |row| {
            row.iter()
                .enumerate()
                .filter(move |(i, _)| Some(*i) != time_idx)
                .map(|(_, v)| v)
        })
    }
}

/// JSON 셀을 Decimal로 변환.
///
/// 숫자와 숫자 문자열만 변환하며 null, bool, 그 외 문자열은 `None`.
pub fn cell_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        // 지수 표기 등 문자열 파싱 실패 시에만 f64 경유
        Value::Number(n) => n
            .to_string()
            .parse()
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
