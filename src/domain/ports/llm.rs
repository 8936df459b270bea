use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{errors::DomainError, ports::PriceSource, Message};

#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError>;
    async fn complete_with_system(&self, system: &str, prompt: &str)
        -> Result<String, DomainError>;
    async fn chat(
        &self,
        system: &str,
        history: &[Message],
        message: &str,
    ) -> Result<String, DomainError>;
    /// Same as `chat`, but the model may look up closing prices while answering.
    async fn chat_with_prices(
        &self,
        system: &str,
        history: &[Message],
        message: &str,
        prices: Arc<dyn PriceSource>,
    ) -> Result<String, DomainError>;
}
