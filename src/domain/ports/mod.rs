mod embedding;
mod llm;
mod price_source;
mod rater;
mod session_store;
mod text_extractor;
mod vector_index;

pub use embedding::EmbeddingService;
pub use llm::LlmService;
pub use price_source::PriceSource;
pub use rater::RelevanceRater;
pub use session_store::SessionStore;
pub use text_extractor::TextExtractor;
pub use vector_index::VectorIndex;
