use std::sync::Arc;
use tracing::info;

use crate::application::Collection;
use crate::domain::{
    ports::{EmbeddingService, VectorIndex},
    DomainError,
};
use crate::infrastructure::{Config, InMemoryVectorIndex, QdrantVectorIndex, TextEmbedding};

pub fn vector_index(config: &Config) -> Result<Arc<dyn VectorIndex>, DomainError> {
    match &config.storage.qdrant_url {
        Some(url) => {
            info!(url, "using qdrant vector index");
            Ok(Arc::new(QdrantVectorIndex::new(url)?))
        }
        None => {
            info!("using in-memory vector index");
            Ok(Arc::new(InMemoryVectorIndex::new()))
        }
    }
}

pub fn collection(config: &Config) -> Result<Collection, DomainError> {
    let embedding: Arc<dyn EmbeddingService> =
        Arc::new(TextEmbedding::from_env(&config.embedding)?);
    Ok(Collection::new(
        config.rag.collection.clone(),
        embedding,
        vector_index(config)?,
    ))
}
