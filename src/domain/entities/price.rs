use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
}

/// The day `days_ago` before `today`, moved back to Friday when it lands on a weekend.
pub fn trading_day(today: NaiveDate, days_ago: u32) -> Option<NaiveDate> {
    let mut day = today.checked_sub_days(Days::new(days_ago.into()))?;
    while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        day = day.pred_opt()?;
    }
    Some(day)
}

pub fn normalize_ticker(raw: &str) -> Option<String> {
    let ticker = raw.trim().trim_start_matches('$').to_ascii_uppercase();
    (!ticker.is_empty() && ticker.len() <= 6 && ticker.chars().all(|c| c.is_ascii_uppercase()))
        .then_some(ticker)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_trading_day_skips_weekends() {
        // 2025-05-07 is a Wednesday.
        let today = date(2025, 5, 7);
        let cases = [
            (0, date(2025, 5, 7)),
            (2, date(2025, 5, 5)),
            (3, date(2025, 5, 2)),
            (4, date(2025, 5, 2)),
            (5, date(2025, 5, 2)),
            (7, date(2025, 4, 30)),
        ];
        for (days_ago, expected) in cases {
            assert_eq!(trading_day(today, days_ago), Some(expected), "{days_ago} days ago");
        }
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" aapl ").as_deref(), Some("AAPL"));
        assert_eq!(normalize_ticker("$msft").as_deref(), Some("MSFT"));
        assert_eq!(normalize_ticker("Apple Inc"), None);
        assert_eq!(normalize_ticker("TOOLONGX"), None);
        assert_eq!(normalize_ticker(""), None);
    }
}
