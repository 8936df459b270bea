mod conversation;
mod document;
mod embedding;
mod intent;
mod price;
mod profile;
mod rating;

pub use conversation::{ChatSession, Message, MessageRole};
pub use document::{chunk_id, Chunk, ChunkMetadata, MetadataFilter, RetrievedChunk, SourceDocument};
pub use embedding::Embedding;
pub use intent::{Intent, ReportKind};
pub use price::{normalize_ticker, trading_day, PriceQuote};
pub use profile::{ProfileState, UserProfile};
pub use rating::RelevanceRating;

#[cfg(test)]
pub(crate) use profile::tests::PROFILE_JSON;
