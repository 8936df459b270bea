use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Config, Pool, Runtime};
use serde::Serialize;
use uuid::Uuid;

use crate::infrastructure::{keys, queues, IngestDocumentJob, JobResult, ProcessChatJob};

pub type RedisPool = Pool;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis pool error: {0}")]
    Pool(String),
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QueueError>;

pub fn create_pool(redis_url: &str) -> Result<RedisPool> {
    Config::from_url(redis_url)
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| QueueError::Pool(e.to_string()))
}

#[derive(Clone)]
pub struct JobProducer {
    pool: RedisPool,
    result_ttl_seconds: u64,
}

impl JobProducer {
    pub fn new(pool: RedisPool, result_ttl_seconds: u64) -> Self {
        Self {
            pool,
            result_ttl_seconds,
        }
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| QueueError::Pool(e.to_string()))
    }

    /// Writes the pending status and pushes the payload in one transaction.
    async fn enqueue<J: Serialize>(&self, queue: &str, job_id: Uuid, job: &J) -> Result<Uuid> {
        let payload = serde_json::to_string(job)?;
        let status = serde_json::to_string(&JobResult::pending(job_id))?;

        let mut conn = self.conn().await?;
        let _: () = redis::pipe()
            .atomic()
            .set_ex(keys::job_status(&job_id), status, self.result_ttl_seconds)
            .ignore()
            .lpush(queue, payload)
            .ignore()
            .query_async(&mut *conn)
            .await?;

        tracing::info!(job_id = %job_id, queue, "job queued");
        Ok(job_id)
    }

    pub async fn push_chat_job(&self, job: &ProcessChatJob) -> Result<Uuid> {
        self.enqueue(queues::CHAT_QUEUE, job.job_id, job).await
    }

    pub async fn push_ingest_job(&self, job: &IngestDocumentJob) -> Result<Uuid> {
        self.enqueue(queues::INGEST_QUEUE, job.job_id, job).await
    }

    pub async fn get_job_status(&self, job_id: &Uuid) -> Result<Option<JobResult>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(keys::job_status(job_id)).await?;
        Ok(raw.map(|json| serde_json::from_str(&json)).transpose()?)
    }
}
