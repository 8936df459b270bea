use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{errors::DomainError, PriceQuote};

#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn closing_price(
        &self,
        ticker: &str,
        day: NaiveDate,
    ) -> Result<Option<PriceQuote>, DomainError>;
}
