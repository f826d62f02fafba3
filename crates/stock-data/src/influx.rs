//! InfluxDB 1.x HTTP 클라이언트.
//!
//! `/query` 응답의 첫 번째 statement, 첫 번째 series를 [`QueryTable`]로 변환하고
//! 시세는 line protocol로 `/write`에 기록합니다.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use stock_core::{QueryTable, StockTick, StoreError, TimeSeriesStore};
use tracing::{debug, warn};

use crate::line_protocol::encode_ticks;

/// InfluxDB 접속 설정.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    /// 기본 URL (예: http://localhost:8086)
    pub url: String,
    /// 데이터베이스 이름
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl InfluxConfig {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            username: None,
            password: None,
        }
    }

    /// 인증 정보 설정.
    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), path)
    }

    fn auth_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(u) = &self.username {
            params.push(("u", u.clone()));
        }
        if let Some(p) = &self.password {
            params.push(("p", p.clone()));
        }
        params
    }
}

// =============================================================================
// 응답 스키마
// =============================================================================

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// `/query` 응답 본문을 테이블로 변환.
///
/// series가 없으면 빈 테이블, statement 에러가 있으면 `StoreError::Query`.
pub fn parse_query_response(body: &str) -> Result<QueryTable, StoreError> {
    let response: QueryResponse = serde_json::from_str(body)
        .map_err(|e| StoreError::Parse(format!("InfluxDB 응답 파싱 실패: {}", e)))?;

    if let Some(err) = response.error {
        return Err(StoreError::Query(err));
    }

    let Some(statement) = response.results.into_iter().next() else {
        return Ok(QueryTable::empty());
    };
    if let Some(err) = statement.error {
        return Err(StoreError::Query(err));
    }

    Ok(statement
        .series
        .into_iter()
        .next()
        .map(|s| QueryTable::new(s.columns, s.values))
        .unwrap_or_default())
}

// =============================================================================
// 클라이언트
// =============================================================================

/// InfluxDB HTTP 클라이언트.
///
/// `reqwest::Client`는 내부적으로 연결을 재사용하므로 복제해서 공유합니다.
#[derive(Clone)]
pub struct InfluxClient {
    config: InfluxConfig,
    client: reqwest::Client,
}

impl InfluxClient {
    pub fn new(config: InfluxConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }
}

#[async_trait]
impl TimeSeriesStore for InfluxClient {
    async fn query(&self, query: &str) -> Result<QueryTable, StoreError> {
        debug!(query = %query, "InfluxDB 쿼리 실행");

        let mut params = vec![("db", self.config.database.clone()), ("q", query.to_string())];
        params.extend(self.config.auth_params());

        let response = self
            .client
            .get(self.config.endpoint("query"))
            .query(&params)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if !status.is_success() {
            // 4xx 응답도 {"error": "..."} 본문을 가짐
            return match parse_query_response(&body) {
                Err(e) => Err(e),
                Ok(_) => Err(StoreError::Query(format!("HTTP {}: {}", status, body))),
            };
        }

        parse_query_response(&body)
    }

    async fn write_ticks(&self, ticks: &[StockTick]) -> Result<usize, StoreError> {
        if ticks.is_empty() {
            return Ok(0);
        }

        let mut params = vec![("db", self.config.database.clone())];
        params.extend(self.config.auth_params());

        let response = self
            .client
            .post(self.config.endpoint("write"))
            .query(&params)
            .body(encode_ticks(ticks))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if response.status().is_success() {
            debug!(count = ticks.len(), "InfluxDB 시세 기록 완료");
            Ok(ticks.len())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("InfluxDB 기록 실패: {} - {}", status, body);
            Err(StoreError::Query(format!("HTTP {}: {}", status, body)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockito::Matcher;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_series() {
        let body = r#"{"results":[{"statement_id":0,"series":[{"name":"stock_ticks",
            "columns":["time","current"],"values":[["2024-01-02T02:15:03Z",10.5],["2024-01-02T02:15:06Z",10.6]]}]}]}"#;
        let table = parse_query_response(body).unwrap();
        assert_eq!(table.columns, vec!["time", "current"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, "current"), Some(&json!(10.6)));
    }

    #[test]
    fn test_parse_no_series() {
        let table = parse_query_response(r#"{"results":[{"statement_id":0}]}"#).unwrap();
        assert!(table.is_empty());
        let table = parse_query_response(r#"{"results":[]}"#).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_query_response(r#"{"results":[{"statement_id":0,"error":"measurement not found"}]}"#),
            Err(StoreError::Query(_))
        ));
        assert!(matches!(
            parse_query_response(r#"{"error":"error parsing query"}"#),
            Err(StoreError::Query(_))
        ));
        assert!(matches!(
            parse_query_response("not json"),
            Err(StoreError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_query_against_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("db".into(), "stock".into()),
                Matcher::UrlEncoded("q".into(), "SELECT current FROM stock_ticks".into()),
                Matcher::UrlEncoded("u".into(), "reader".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"results":[{"statement_id":0,"series":[{"name":"stock_ticks","columns":["time","current"],"values":[["2024-01-02T02:15:03Z",12]]}]}]}"#)
            .create_async()
            .await;

        let client = InfluxClient::new(
            InfluxConfig::new(server.url(), "stock")
                .with_credentials("reader".to_string(), "secret".to_string()),
        );
        let table = client.query("SELECT current FROM stock_ticks").await.unwrap();

        mock.assert_async().await;
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_query_bad_request() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":"error parsing query: found EOF"}"#)
            .create_async()
            .await;

        let client = InfluxClient::new(InfluxConfig::new(server.url(), "stock"));
        let err = client.query("SELECT").await.unwrap_err();
        assert!(matches!(err, StoreError::Query(msg) if msg.contains("error parsing query")));
    }

    #[tokio::test]
    async fn test_write_ticks() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/write")
            .match_query(Matcher::UrlEncoded("db".into(), "stock".into()))
            .match_body(Matcher::Regex("^stock_ticks,code=SZ.000001 current=10.5 ".into()))
            .with_status(204)
            .create_async()
            .await;

        let client = InfluxClient::new(InfluxConfig::new(server.url(), "stock"));
        let ticks = vec![StockTick::new("SZ.000001", Utc::now(), dec!(10.5))];
        assert_eq!(client.write_ticks(&ticks).await.unwrap(), 1);
        assert_eq!(client.write_ticks(&[]).await.unwrap(), 0);

        mock.assert_async().await;
    }
}
