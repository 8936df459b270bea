use crate::domain::{errors::DomainError, SourceDocument};
use async_trait::async_trait;

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, document: &SourceDocument) -> Result<String, DomainError>;
}
