mod chat;
mod collection;
mod ingestion;
mod prompt;
mod retrieval;

pub use chat::{ChatPrompts, ChatReply, ChatService, PROFILE_SAVED_MESSAGE};
pub use collection::Collection;
pub use ingestion::{IngestReport, IngestionService};
pub use prompt::{assemble_prompt, assemble_prompt_with, DEFAULT_INSTRUCTION};
pub use retrieval::{context_part, RetrievalGate, RetrievalSettings};
