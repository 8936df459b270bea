mod jobs;

pub use jobs::{
    keys, queues, IngestDocumentJob, JobResult, ProcessChatJob, QueueJobStatus, QueuedJob,
};
