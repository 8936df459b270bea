use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    ports::{EmbeddingService, VectorIndex},
    Chunk, DomainError, MetadataFilter, RetrievedChunk,
};

#[derive(Clone)]
pub struct Collection {
    name: String,
    embedding: Arc<dyn EmbeddingService>,
    index: Arc<dyn VectorIndex>,
}

impl Collection {
    pub fn new(
        name: impl Into<String>,
        embedding: Arc<dyn EmbeddingService>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            name: name.into(),
            embedding,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            embedding: self.embedding.clone(),
            index: self.index.clone(),
        }
    }

    #[instrument(skip(self), fields(collection = %self.name, model = self.embedding.model()))]
    pub async fn ensure_exists(&self) -> Result<(), DomainError> {
        self.index
            .create_collection(&self.name, self.embedding.dimension())
            .await
    }

    #[instrument(skip(self, chunks), fields(collection = %self.name, count = chunks.len()))]
    pub async fn upsert_all(&self, chunks: &[Chunk]) -> Result<(), DomainError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(DomainError::external(format!(
                "embedding service returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        self.index.upsert_all(&self.name, chunks, &embeddings).await
    }

    #[instrument(skip(self), fields(collection = %self.name))]
    pub async fn delete_where(&self, filter: &MetadataFilter) -> Result<(), DomainError> {
        self.index.delete_where(&self.name, filter).await
    }

    pub async fn count_where(&self, filter: &MetadataFilter) -> Result<usize, DomainError> {
        self.index.count_where(&self.name, filter).await
    }

    #[instrument(skip(self), fields(collection = %self.name))]
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedChunk>, DomainError> {
        let embedding = self.embedding.embed(text).await?;
        self.index.query(&self.name, &embedding, k).await
    }
}
