use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod queues {
    pub const CHAT_QUEUE: &str = "jobs:chat";
    pub const INGEST_QUEUE: &str = "jobs:ingest";

    /// Polled in this order by the worker.
    pub const ALL: [&str; 2] = [CHAT_QUEUE, INGEST_QUEUE];
}

pub mod keys {
    use uuid::Uuid;

    pub fn job_status(job_id: &Uuid) -> String {
        format!("job:status:{job_id}")
    }

    pub fn session(user_id: &str) -> String {
        format!("session:{user_id}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: Uuid,
    pub status: QueueJobStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobResult {
    fn open(job_id: Uuid, status: QueueJobStatus) -> Self {
        Self {
            job_id,
            status,
            result: None,
            error: None,
            completed_at: None,
        }
    }

    pub fn pending(job_id: Uuid) -> Self {
        Self::open(job_id, QueueJobStatus::Pending)
    }

    pub fn processing(job_id: Uuid) -> Self {
        Self::open(job_id, QueueJobStatus::Processing)
    }

    pub fn completed(job_id: Uuid, result: serde_json::Value) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Completed,
            result: Some(result),
            error: None,
            completed_at: Some(Utc::now()),
        }
    }

    pub fn failed(job_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            job_id,
            status: QueueJobStatus::Failed,
            result: None,
            error: Some(error.into()),
            completed_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessChatJob {
    pub job_id: Uuid,
    pub user_id: String,
    pub message: String,
}

impl ProcessChatJob {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            user_id: user_id.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestDocumentJob {
    pub job_id: Uuid,
    pub source: String,
    /// Falls back to the configured collection.
    #[serde(default)]
    pub collection: Option<String>,
}

impl IngestDocumentJob {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            source: source.into(),
            collection: None,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }
}

#[derive(Debug, Clone)]
pub enum QueuedJob {
    Chat(ProcessChatJob),
    Ingest(IngestDocumentJob),
}

impl QueuedJob {
    pub fn parse(queue: &str, payload: &str) -> Result<Self, serde_json::Error> {
        if queue == queues::INGEST_QUEUE {
            serde_json::from_str(payload).map(Self::Ingest)
        } else {
            serde_json::from_str(payload).map(Self::Chat)
        }
    }

    pub fn job_id(&self) -> Uuid {
        match self {
            Self::Chat(job) => job.job_id,
            Self::Ingest(job) => job.job_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_queue() {
        let ingest = IngestDocumentJob::new("plan.pdf");
        let payload = serde_json::to_string(&ingest).unwrap();
        match QueuedJob::parse(queues::INGEST_QUEUE, &payload).unwrap() {
            QueuedJob::Ingest(job) => {
                assert_eq!(job.source, "plan.pdf");
                assert_eq!(job.collection, None);
            }
            other => panic!("unexpected job {other:?}"),
        }

        let chat = ProcessChatJob::new("u1", "hi");
        let parsed =
            QueuedJob::parse(queues::CHAT_QUEUE, &serde_json::to_string(&chat).unwrap()).unwrap();
        assert_eq!(parsed.job_id(), chat.job_id);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let status = serde_json::to_value(JobResult::failed(Uuid::new_v4(), "not found")).unwrap();
        assert_eq!(status["status"], "failed");
        assert_eq!(status["error"], "not found");
        assert_eq!(
            serde_json::to_value(JobResult::pending(Uuid::new_v4())).unwrap()["status"],
            "pending"
        );
    }
}
