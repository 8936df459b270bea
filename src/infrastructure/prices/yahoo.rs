use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::{ports::PriceSource, DomainError, PriceQuote};
use crate::infrastructure::config::PricesConfig;

const SECONDS_PER_DAY: i64 = 86_400;

pub struct YahooPriceSource {
    client: reqwest::Client,
    base_url: String,
}

impl YahooPriceSource {
    pub fn new(config: &PricesConfig) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("retirement-rag/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::config(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, ticker: &str, day: NaiveDate) -> Option<String> {
        let start = day.and_hms_opt(0, 0, 0)?.and_utc().timestamp();
        Some(format!(
            "{}/{ticker}?period1={start}&period2={}&interval=1d",
            self.base_url,
            start + SECONDS_PER_DAY
        ))
    }
}

#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn parse_chart(body: &str, ticker: &str, day: NaiveDate) -> Result<Option<PriceQuote>, DomainError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| DomainError::external(format!("unexpected chart response: {e}")))?;

    let close = response
        .chart
        .result
        .unwrap_or_default()
        .into_iter()
        .flat_map(|r| r.indicators.quote)
        .flat_map(|q| q.close)
        .flatten()
        .next();

    Ok(close.map(|close| PriceQuote {
        ticker: ticker.to_string(),
        date: day,
        close,
    }))
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    async fn closing_price(
        &self,
        ticker: &str,
        day: NaiveDate,
    ) -> Result<Option<PriceQuote>, DomainError> {
        let url = self
            .url(ticker, day)
            .ok_or_else(|| DomainError::validation(format!("invalid date {day}")))?;

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DomainError::external(format!("price request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DomainError::external(format!(
                "price request for {ticker} returned {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;
        let quote = parse_chart(&body, ticker, day)?;
        debug!(ticker, %day, found = quote.is_some(), "closing price fetched");
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 7).unwrap()
    }

    #[test]
    fn test_parse_first_close() {
        let body = r#"{"chart":{"result":[{"meta":{"symbol":"AAPL"},"timestamp":[1746624600],
            "indicators":{"quote":[{"open":[197.7],"close":[null, 196.25]}]}}],"error":null}}"#;

        let quote = parse_chart(body, "AAPL", day()).unwrap().unwrap();
        assert_eq!(quote.ticker, "AAPL");
        assert_eq!(quote.date, day());
        assert!((quote.close - 196.25).abs() < 1e-9);
    }

    #[test]
    fn test_parse_without_data() {
        let empty = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert_eq!(parse_chart(empty, "AAPL", day()).unwrap(), None);

        let unknown = r#"{"chart":{"result":null,"error":{"code":"Not Found"}}}"#;
        assert_eq!(parse_chart(unknown, "ZZZZ", day()).unwrap(), None);

        assert!(matches!(
            parse_chart("<html>", "AAPL", day()),
            Err(DomainError::ExternalService(_))
        ));
    }

    #[test]
    fn test_url_covers_one_day() {
        let source = YahooPriceSource::new(&PricesConfig {
            base_url: "https://prices.test/chart/".to_string(),
            timeout_seconds: 1,
        })
        .unwrap();

        assert_eq!(
            source.url("AAPL", day()).unwrap(),
            "https://prices.test/chart/AAPL?period1=1746576000&period2=1746662400&interval=1d"
        );
    }
}
