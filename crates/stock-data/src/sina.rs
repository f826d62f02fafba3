//! Sina 실시간 시세 클라이언트.
//!
//! `GET /list=sh600000,sz000001` 응답의 `var hq_str_<code>="...";` 줄을
//! [`StockTick`]으로 변환합니다. 상하이/선전 종목만 조회할 수 있습니다.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use stock_core::{MarketType, QuoteClient, QuotedPrice, StockTick, StoreError, ORDER_BOOK_DEPTH};
use tracing::{debug, warn};

/// 기본 시세 서버
pub const DEFAULT_SINA_URL: &str = "https://hq.sinajs.cn";

/// Referer가 없으면 서버가 403을 반환함
const SINA_REFERER: &str = "https://finance.sina.com.cn";

/// 응답 한 줄의 최소 필드 수 (날짜, 시각까지)
const MIN_FIELDS: usize = 32;

/// Sina 시세 접속 설정.
#[derive(Debug, Clone)]
pub struct SinaConfig {
    pub url: String,
}

impl SinaConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// `SINA_QUOTE_URL` 환경 변수 (미설정 시 기본 서버).
    pub fn from_env() -> Self {
        Self::new(std::env::var("SINA_QUOTE_URL").unwrap_or_else(|_| DEFAULT_SINA_URL.to_string()))
    }
}

impl Default for SinaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SINA_URL)
    }
}

/// `SZ.000001` / `000001.XSHE` → `sz000001`.
///
/// 상하이/선전 이외 시장은 `None`.
pub fn vendor_code(code: &str) -> Option<String> {
    let prefix = match MarketType::detect(code) {
        MarketType::Sh => "sh",
        MarketType::Sz => "sz",
        _ => return None,
    };
    let upper = code.trim().to_uppercase();
    let digits = upper
        .strip_prefix("SH.")
        .or_else(|| upper.strip_prefix("SZ."))
        .or_else(|| upper.strip_suffix(".XSHG"))
        .or_else(|| upper.strip_suffix(".XSHE"))?;
    Some(format!("{}{}", prefix, digits))
}

fn decimal_field(fields: &[&str], index: usize) -> Option<Decimal> {
    fields.get(index)?.trim().parse().ok()
}

fn integer_field(fields: &[&str], index: usize) -> Option<i64> {
    decimal_field(fields, index)?.trunc().to_i64()
}

/// 응답 한 줄 파싱.
///
/// 반환값의 첫 요소는 벤더 코드입니다. 빈 페이로드(거래 정지, 없는 종목)는 `Ok(None)`.
pub fn parse_quote_line(line: &str) -> Result<Option<(String, StockTick)>, StoreError> {
    let (lhs, rhs) = line
        .trim()
        .strip_prefix("var hq_str_")
        .and_then(|rest| rest.split_once('='))
        .ok_or_else(|| StoreError::Parse(format!("Sina 응답 형식 오류: {}", line)))?;

    let vendor = lhs.trim().to_string();
    let payload = rhs.trim().trim_end_matches(';').trim_matches('"');
    if payload.is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = payload.split(',').collect();
    if fields.len() < MIN_FIELDS {
        return Err(StoreError::Parse(format!(
            "{}: 필드 수 부족 ({})",
            vendor,
            fields.len()
        )));
    }

    let date = NaiveDate::parse_from_str(fields[30], "%Y-%m-%d")
        .map_err(|e| StoreError::Parse(format!("{}: 날짜 파싱 실패 ({}): {}", vendor, fields[30], e)))?;
    let time = NaiveTime::parse_from_str(fields[31], "%H:%M:%S")
        .map_err(|e| StoreError::Parse(format!("{}: 시각 파싱 실패 ({}): {}", vendor, fields[31], e)))?;
    let time = chrono_tz::Asia::Shanghai
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| StoreError::Parse(format!("{}: 모호한 현지 시각", vendor)))?
        .with_timezone(&Utc);

    let current = decimal_field(&fields, 3)
        .ok_or_else(|| StoreError::Parse(format!("{}: 현재가 파싱 실패 ({})", vendor, fields[3])))?;

    // 호가는 (잔량, 가격) 쌍: 매수 10..20, 매도 20..30
    let levels = |offset: usize| -> Vec<QuotedPrice> {
        (0..ORDER_BOOK_DEPTH)
            .filter_map(|level| {
                let volume = integer_field(&fields, offset + level * 2)?;
                let value = decimal_field(&fields, offset + level * 2 + 1)?;
                Some(QuotedPrice { value, volume })
            })
            .collect()
    };

    let mut tick = StockTick::new(String::new(), time, current)
        .with_name(fields[0])
        .with_order_book(levels(10), levels(20));
    tick.volume = integer_field(&fields, 8);
    tick.turnover = integer_field(&fields, 9);

    Ok(Some((vendor, tick)))
}

/// Sina 실시간 시세 클라이언트.
#[derive(Clone)]
pub struct SinaQuoteClient {
    config: SinaConfig,
    client: reqwest::Client,
}

impl SinaQuoteClient {
    pub fn new(config: SinaConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl QuoteClient for SinaQuoteClient {
    fn name(&self) -> &str {
        "sina"
    }

    async fn fetch_ticks(&self, codes: &[String]) -> Result<Vec<StockTick>, StoreError> {
        // (벤더 코드, 요청 코드)
        let requested: Vec<(String, &String)> = codes
            .iter()
            .filter_map(|code| match vendor_code(code) {
                Some(vendor) => Some((vendor, code)),
                None => {
                    warn!(code = %code, "Sina 미지원 종목");
                    None
                }
            })
            .collect();
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let list = requested
            .iter()
            .map(|(vendor, _)| vendor.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/list={}", self.config.url.trim_end_matches('/'), list);
        debug!(count = requested.len(), "Sina 시세 조회");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::REFERER, SINA_REFERER)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Network(format!("HTTP {}: {}", status, body)));
        }

        let mut ticks = Vec::with_capacity(requested.len());
        for line in body.lines().filter(|l| !l.trim().is_empty()) {
            let Some((vendor, mut tick)) = parse_quote_line(line)? else {
                continue;
            };
            match requested.iter().find(|(v, _)| *v == vendor) {
                Some((_, code)) => {
                    tick.code = (*code).clone();
                    ticks.push(tick);
                }
                None => warn!(vendor = %vendor, "요청하지 않은 종목 응답"),
            }
        }
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use rust_decimal_macros::dec;

    /// 필드 33개짜리 응답 줄 생성
    fn quote_line(vendor: &str, name: &str, current: &str) -> String {
        let mut fields = vec![
            name.to_string(),
            "10.00".into(),
            "9.90".into(),
            current.to_string(),
            "10.60".into(),
            "9.80".into(),
            "10.49".into(),
            "10.51".into(),
            "1234500".into(),
            "12960000.500".into(),
        ];
        for (volume, price) in [("1200", "10.49"), ("300", "10.48"), ("0", "10.47"), ("0", "10.46"), ("0", "10.45")] {
            fields.push(volume.into());
            fields.push(price.into());
        }
        for (volume, price) in [("800", "10.51"), ("0", "10.52"), ("0", "10.53"), ("0", "10.54"), ("0", "10.55")] {
            fields.push(volume.into());
            fields.push(price.into());
        }
        fields.push("2024-01-02".into());
        fields.push("10:20:03".into());
        fields.push("00".into());
        format!("var hq_str_{}=\"{}\";", vendor, fields.join(","))
    }

    #[test]
    fn test_vendor_code() {
        assert_eq!(vendor_code("SZ.000001").as_deref(), Some("sz000001"));
        assert_eq!(vendor_code("sh.600000").as_deref(), Some("sh600000"));
        assert_eq!(vendor_code("600000.XSHG").as_deref(), Some("sh600000"));
        assert_eq!(vendor_code("HK.00700"), None);
    }

    #[test]
    fn test_parse_quote_line() {
        let (vendor, tick) = parse_quote_line(&quote_line("sz000001", "平安银行", "10.50"))
            .unwrap()
            .unwrap();

        assert_eq!(vendor, "sz000001");
        assert_eq!(tick.name.as_deref(), Some("平安银行"));
        assert_eq!(tick.current, dec!(10.50));
        assert_eq!(tick.volume, Some(1234500));
        assert_eq!(tick.turnover, Some(12960000));
        assert_eq!(tick.bids.len(), 5);
        assert_eq!(tick.bid_vs_ask(), "1500 / 800");
        // 10:20:03 상하이 = 02:20:03 UTC
        assert_eq!(tick.time, Utc.with_ymd_and_hms(2024, 1, 2, 2, 20, 3).unwrap());
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert!(parse_quote_line("var hq_str_sz999999=\"\";").unwrap().is_none());
        assert!(matches!(
            parse_quote_line("var hq_str_sz000001=\"a,b,c\";"),
            Err(StoreError::Parse(_))
        ));
        assert!(matches!(parse_quote_line("<html>"), Err(StoreError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_ticks_against_server() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            "{}\n{}\n",
            quote_line("sz000001", "平安银行", "10.50"),
            quote_line("sh600000", "浦发银行", "7.20")
        );
        let mock = server
            .mock("GET", "/list=sz000001,sh600000")
            .match_header("referer", Matcher::Regex("sina".into()))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = SinaQuoteClient::new(SinaConfig::new(server.url()));
        let codes = vec![
            "SZ.000001".to_string(),
            "600000.XSHG".to_string(),
            "HK.00700".to_string(),
        ];
        let ticks = client.fetch_ticks(&codes).await.unwrap();

        mock.assert_async().await;
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].code, "SZ.000001");
        assert_eq!(ticks[1].code, "600000.XSHG");
        assert_eq!(ticks[1].current, dec!(7.20));
    }

    #[tokio::test]
    async fn test_fetch_ticks_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(403)
            .with_body("Forbidden")
            .create_async()
            .await;

        let client = SinaQuoteClient::new(SinaConfig::new(server.url()));
        let err = client.fetch_ticks(&["SZ.000001".to_string()]).await.unwrap_err();
        assert!(matches!(err, StoreError::Network(msg) if msg.contains("403")));
    }

    #[tokio::test]
    async fn test_unsupported_codes_skip_request() {
        let client = SinaQuoteClient::new(SinaConfig::new("http://127.0.0.1:1"));
        let ticks = client.fetch_ticks(&["HK.00700".to_string()]).await.unwrap();
        assert!(ticks.is_empty());
    }
}
