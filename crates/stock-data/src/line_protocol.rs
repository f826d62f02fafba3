//! InfluxDB line protocol 인코딩.

use stock_core::StockTick;

/// 시세 측정값 이름
pub const TICK_MEASUREMENT: &str = "stock_ticks";

/// 태그 키/값 이스케이프 (쉼표, 공백, 등호).
fn escape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | ' ' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// 문자열 필드 값 이스케이프 (큰따옴표, 역슬래시).
fn escape_string_field(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// 시세 한 건을 line protocol 한 줄로 변환.
///
/// `code`는 태그, 나머지는 필드이며 타임스탬프는 나노초 단위입니다.
pub fn encode_tick(tick: &StockTick) -> String {
    let mut fields: Vec<String> = Vec::with_capacity(24);

    if let Some(name) = &tick.name {
        fields.push(format!("name=\"{}\"", escape_string_field(name)));
    }
    fields.push(format!("current={}", tick.current));
    if let Some(volume) = tick.volume {
        fields.push(format!("volume={}i", volume));
    }
    if let Some(turnover) = tick.turnover {
        fields.push(format!("turnover={}i", turnover));
    }
    for (side, levels) in [("bid", &tick.bids), ("ask", &tick.asks)] {
        for (i, level) in levels.iter().enumerate() {
            fields.push(format!("{}_{}_price={}", side, i + 1, level.value));
            fields.push(format!("{}_{}_volume={}i", side, i + 1, level.volume));
        }
    }

    let timestamp = tick
        .time
        .timestamp_nanos_opt()
        .unwrap_or_else(|| tick.time.timestamp() * 1_000_000_000);

    format!(
        "{},code={} {} {}",
        TICK_MEASUREMENT,
        escape_tag(&tick.code),
        fields.join(","),
        timestamp
    )
}

/// 여러 시세를 줄바꿈으로 연결.
pub fn encode_ticks(ticks: &[StockTick]) -> String {
    ticks.iter().map(encode_tick).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use stock_core::QuotedPrice;

    #[test]
    fn test_encode_tick() {
        let time = Utc.with_ymd_and_hms(2024, 1, 2, 2, 15, 3).unwrap();
        let mut tick = StockTick::new("SZ.000001", time, dec!(10.51))
            .with_name("Ping An \"Bank\"")
            .with_order_book(
                vec![QuotedPrice { value: dec!(10.50), volume: 1200 }],
                vec![QuotedPrice { value: dec!(10.52), volume: 300 }],
            );
        tick.volume = Some(98765);

        let line = encode_tick(&tick);
        assert_eq!(
            line,
            "stock_ticks,code=SZ.000001 name=\"Ping An \\\"Bank\\\"\",current=10.51,volume=98765i,\
             bid_1_price=10.50,bid_1_volume=1200i,ask_1_price=10.52,ask_1_volume=300i \
             1704161703000000000"
        );
    }

    #[test]
    fn test_escape_tag() {
        assert_eq!(escape_tag("a b,c=d"), "a\\ b\\,c\\=d");
    }

    #[test]
    fn test_encode_ticks_joins_lines() {
        let time = Utc.with_ymd_and_hms(2024, 1, 2, 2, 15, 3).unwrap();
        let ticks = vec![
            StockTick::new("SZ.000001", time, dec!(1)),
            StockTick::new("SZ.000002", time, dec!(2)),
        ];
        assert_eq!(encode_ticks(&ticks).lines().count(), 2);
    }
}
