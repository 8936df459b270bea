pub mod services;

pub use services::{
    ChatPrompts, ChatReply, ChatService, Collection, IngestReport, IngestionService,
    RetrievalGate, RetrievalSettings,
};
