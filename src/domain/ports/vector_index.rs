use async_trait::async_trait;

use crate::domain::{errors::DomainError, Chunk, Embedding, MetadataFilter, RetrievedChunk};

/// Storage side of a vector collection. Callers embed text themselves and
/// must use the same embedding function for a collection's whole lifetime.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn create_collection(&self, collection: &str, dimension: usize)
        -> Result<(), DomainError>;

    async fn upsert(
        &self,
        collection: &str,
        chunk: &Chunk,
        embedding: &Embedding,
    ) -> Result<(), DomainError>;

    /// Stores `chunks[i]` under `embeddings[i]`. Backends with a bulk write
    /// override this; the default upserts one entry at a time.
    async fn upsert_all(
        &self,
        collection: &str,
        chunks: &[Chunk],
        embeddings: &[Embedding],
    ) -> Result<(), DomainError> {
        if chunks.len() != embeddings.len() {
            return Err(DomainError::validation(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            self.upsert(collection, chunk, embedding).await?;
        }
        Ok(())
    }

    async fn delete_where(
        &self,
        collection: &str,
        filter: &MetadataFilter,
    ) -> Result<(), DomainError>;

    async fn count_where(
        &self,
        collection: &str,
        filter: &MetadataFilter,
    ) -> Result<usize, DomainError>;

    async fn query(
        &self,
        collection: &str,
        query: &Embedding,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, DomainError>;
}
