use crate::domain::{errors::DomainError, ChatSession};
use async_trait::async_trait;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Option<ChatSession>, DomainError>;
    async fn save(&self, session: &ChatSession) -> Result<(), DomainError>;
}
