pub mod bootstrap;
pub mod config;
pub mod embedding;
pub mod extraction;
pub mod llm;
pub mod prices;
pub mod queue;
pub mod rating;
pub mod session;
pub mod tools;
pub mod vector_index;

pub use config::{AppConfig, Config, PromptsConfig};
pub use embedding::TextEmbedding;
pub use extraction::DocumentTextExtractor;
pub use llm::GeminiLlm;
pub use prices::YahooPriceSource;
pub use queue::{
    keys, queues, IngestDocumentJob, JobResult, ProcessChatJob, QueueJobStatus, QueuedJob,
};
pub use rating::GeminiRelevanceRater;
pub use session::RedisSessionStore;
pub use vector_index::{InMemoryVectorIndex, QdrantVectorIndex};
