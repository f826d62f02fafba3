//! 실시간 시세 스냅샷.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::table::{cell_to_decimal, QueryTable, TIME_COLUMN};
use crate::StoreError;

/// 호가 단계 수 (매수/매도 각 5단계)
pub const ORDER_BOOK_DEPTH: usize = 5;

/// 매수/매도 호가 한 단계.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotedPrice {
    pub value: Decimal,
    pub volume: i64,
}

/// 종목 실시간 시세.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTick {
    /// 종목 코드
    pub code: String,
    /// 종목명
    pub name: Option<String>,
    /// 시세 발생 시각
    pub time: DateTime<Utc>,
    /// 현재가
    pub current: Decimal,
    /// 누적 거래량
    pub volume: Option<i64>,
    /// 누적 거래대금
    pub turnover: Option<i64>,
    /// 매수 호가 (최대 5단계)
    #[serde(default)]
    pub bids: Vec<QuotedPrice>,
    /// 매도 호가 (최대 5단계)
    #[serde(default)]
    pub asks: Vec<QuotedPrice>,
}

impl StockTick {
    /// 호가 없는 시세 생성.
    pub fn new(code: impl Into<String>, time: DateTime<Utc>, current: Decimal) -> Self {
        Self {
            code: code.into(),
            name: None,
            time,
            current,
            volume: None,
            turnover: None,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_order_book(mut self, bids: Vec<QuotedPrice>, asks: Vec<QuotedPrice>) -> Self {
        self.bids = bids;
        self.asks = asks;
        self
    }

    /// 매수 잔량 합계
    pub fn total_bid_volume(&self) -> i64 {
        self.bids.iter().map(|b| b.volume).sum()
    }

    /// 매도 잔량 합계
    pub fn total_ask_volume(&self) -> i64 {
        self.asks.iter().map(|a| a.volume).sum()
    }

    /// 매수/매도 잔량 비교 문자열 (예: "1200 / 800")
    pub fn bid_vs_ask(&self) -> String {
        format!("{} / {}", self.total_bid_volume(), self.total_ask_volume())
    }

    /// `stock_ticks` 측정값의 한 행에서 시세를 복원.
    ///
    /// 호가 컬럼은 `bid_1_price`, `bid_1_volume`, ... `ask_5_volume` 형식입니다.
    /// 가격이 없는 호가 단계는 건너뜁니다.
    pub fn from_row(table: &QueryTable, row: usize) -> Result<Self, StoreError> {
        let text = |column: &str| {
            table
                .cell(row, column)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        let decimal = |column: &str| table.cell(row, column).and_then(cell_to_decimal);
        let integer = |column: &str| decimal(column).and_then(|d| d.trunc().to_i64());

        let code = text("code")
            .ok_or_else(|| StoreError::Parse(format!("row {}: code 컬럼 없음", row)))?;
        let time_raw = text(TIME_COLUMN)
            .ok_or_else(|| StoreError::Parse(format!("row {}: time 컬럼 없음", row)))?;
        let time = DateTime::parse_from_rfc3339(&time_raw)
            .map_err(|e| StoreError::Parse(format!("time 파싱 실패 ({}): {}", time_raw, e)))?
            .with_timezone(&Utc);
        let current = decimal("current")
            .ok_or_else(|| StoreError::Parse(format!("row {}: current 컬럼 없음", row)))?;

        let levels = |side: &str| -> Vec<QuotedPrice> {
            (1..=ORDER_BOOK_DEPTH)
                .filter_map(|level| {
                    let value = decimal(&format!("{}_{}_price", side, level))?;
                    let volume = integer(&format!("{}_{}_volume", side, level)).unwrap_or(0);
                    Some(QuotedPrice { value, volume })
                })
                .collect()
        };

        Ok(Self {
            code,
            name: text("name"),
            time,
            current,
            volume: integer("volume"),
            turnover: integer("turnover"),
            bids: levels("bid"),
            asks: levels("ask"),
        })
    }
}
