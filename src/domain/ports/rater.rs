use crate::domain::{errors::DomainError, RelevanceRating};
use async_trait::async_trait;

#[async_trait]
pub trait RelevanceRater: Send + Sync {
    async fn rate(&self, query: &str, context: &[String])
        -> Result<RelevanceRating, DomainError>;
}
