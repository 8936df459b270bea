use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Pool};

use crate::domain::{ports::SessionStore, ChatSession, DomainError};
use crate::infrastructure::queue::keys;

/// Sessions as JSON strings under `session:{user_id}`, refreshed on every save.
#[derive(Clone)]
pub struct RedisSessionStore {
    pool: Pool,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    pub fn new(pool: Pool, ttl_seconds: u64) -> Self {
        Self { pool, ttl_seconds }
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, DomainError> {
        self.pool
            .get()
            .await
            .map_err(|e| DomainError::external(format!("redis pool: {e}")))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, user_id: &str) -> Result<Option<ChatSession>, DomainError> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn
            .get(keys::session(user_id))
            .await
            .map_err(|e| DomainError::external(format!("redis: {e}")))?;

        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| DomainError::internal(format!("corrupt session for {user_id}: {e}")))
        })
        .transpose()
    }

    async fn save(&self, session: &ChatSession) -> Result<(), DomainError> {
        let json = serde_json::to_string(session)
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(keys::session(&session.user_id), json, self.ttl_seconds)
            .await
            .map_err(|e| DomainError::external(format!("redis: {e}")))
    }
}
