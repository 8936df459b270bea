use chrono::{NaiveDate, Utc};
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::domain::{normalize_ticker, ports::PriceSource, trading_day};

#[derive(Debug, thiserror::Error)]
#[error("Stock price error: {0}")]
pub struct StockPriceError(pub String);

#[derive(Debug, Deserialize, Serialize)]
pub struct StockPriceArgs {
    pub ticker: String,
    #[serde(default)]
    pub days_ago: u32,
}

pub struct StockPriceTool {
    prices: Arc<dyn PriceSource>,
}

impl StockPriceTool {
    pub fn new(prices: Arc<dyn PriceSource>) -> Self {
        Self { prices }
    }

    async fn lookup(&self, args: StockPriceArgs, today: NaiveDate) -> Result<String, StockPriceError> {
        let ticker = normalize_ticker(&args.ticker)
            .ok_or_else(|| StockPriceError(format!("not a ticker symbol: {}", args.ticker)))?;
        let day = trading_day(today, args.days_ago)
            .ok_or_else(|| StockPriceError(format!("{} days ago is out of range", args.days_ago)))?;

        match self.prices.closing_price(&ticker, day).await {
            Ok(Some(quote)) => Ok(format!(
                "{} closing price on {} was ${:.2}",
                quote.ticker, quote.date, quote.close
            )),
            Ok(None) => Ok(format!("No data found for {ticker} on {day}.")),
            Err(e) => Err(StockPriceError(e.to_string())),
        }
    }
}

impl Tool for StockPriceTool {
    const NAME: &'static str = "stock_price";

    type Error = StockPriceError;
    type Args = StockPriceArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Closing price of a stock on a past trading day. Weekends resolve to \
the previous Friday."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "ticker": {
                        "type": "string",
                        "description": "Ticker symbol, e.g. AAPL"
                    },
                    "days_ago": {
                        "type": "integer",
                        "description": "0 for the latest close, 1 for yesterday, 7 for last week"
                    }
                },
                "required": ["ticker"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        self.lookup(args, Utc::now().date_naive()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedPrices;

    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 7).unwrap()
    }

    fn args(ticker: &str, days_ago: u32) -> StockPriceArgs {
        StockPriceArgs {
            ticker: ticker.to_string(),
            days_ago,
        }
    }

    #[tokio::test]
    async fn test_lookup_formats_close() {
        let prices = Arc::new(ScriptedPrices::new([("AAPL", 196.254)]));
        let tool = StockPriceTool::new(prices.clone());

        let out = tool.lookup(args("aapl", 0), wednesday()).await.unwrap();
        assert_eq!(out, "AAPL closing price on 2025-05-07 was $196.25");

        let out = tool.lookup(args("AAPL", 4), wednesday()).await.unwrap();
        assert_eq!(out, "AAPL closing price on 2025-05-02 was $196.25");
        assert_eq!(
            prices.requests(),
            vec![
                ("AAPL".to_string(), wednesday()),
                ("AAPL".to_string(), NaiveDate::from_ymd_opt(2025, 5, 2).unwrap()),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_tickers() {
        let prices = Arc::new(ScriptedPrices::new([("AAPL", 196.25)]));
        let tool = StockPriceTool::new(prices.clone());

        let out = tool.lookup(args("GOOG", 1), wednesday()).await.unwrap();
        assert_eq!(out, "No data found for GOOG on 2025-05-06.");

        assert!(tool.lookup(args("Apple Inc", 0), wednesday()).await.is_err());
        assert_eq!(prices.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_definition_names_tool() {
        let tool = StockPriceTool::new(Arc::new(ScriptedPrices::new([("AAPL", 1.0)])));
        let definition = tool.definition(String::new()).await;

        assert_eq!(definition.name, "stock_price");
        assert_eq!(definition.parameters["required"], json!(["ticker"]));
    }

    #[test]
    fn test_args_default_to_latest_close() {
        let args: StockPriceArgs = serde_json::from_str(r#"{"ticker":"MSFT"}"#).unwrap();
        assert_eq!(args.days_ago, 0);
    }
}
