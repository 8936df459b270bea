use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::{
    ports::VectorIndex, Chunk, DomainError, Embedding, MetadataFilter, RetrievedChunk,
};

struct CollectionEntries {
    dimension: usize,
    entries: Vec<(Chunk, Embedding)>,
}

pub struct InMemoryVectorIndex {
    collections: RwLock<HashMap<String, CollectionEntries>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.collections
            .read()
            .map(|c| c.contains_key(name))
            .unwrap_or(false)
    }

    pub fn chunks(&self, collection: &str) -> Vec<Chunk> {
        self.collections
            .read()
            .ok()
            .and_then(|c| {
                c.get(collection)
                    .map(|e| e.entries.iter().map(|(chunk, _)| chunk.clone()).collect())
            })
            .unwrap_or_default()
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(collection: &str) -> DomainError {
    DomainError::not_found(format!("collection {collection}"))
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn create_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), DomainError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        collections
            .entry(collection.to_string())
            .or_insert_with(|| CollectionEntries {
                dimension,
                entries: Vec::new(),
            });
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        chunk: &Chunk,
        embedding: &Embedding,
    ) -> Result<(), DomainError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let store = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;

        if embedding.dimension() != store.dimension {
            return Err(DomainError::validation(format!(
                "embedding has {} dimensions, collection {collection} expects {}",
                embedding.dimension(),
                store.dimension
            )));
        }

        store.entries.retain(|(c, _)| c.id != chunk.id);
        store.entries.push((chunk.clone(), embedding.clone()));
        Ok(())
    }

    async fn delete_where(
        &self,
        collection: &str,
        filter: &MetadataFilter,
    ) -> Result<(), DomainError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        if let Some(store) = collections.get_mut(collection) {
            store.entries.retain(|(c, _)| !filter.matches(&c.metadata));
        }
        Ok(())
    }

    async fn count_where(
        &self,
        collection: &str,
        filter: &MetadataFilter,
    ) -> Result<usize, DomainError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        Ok(collections
            .get(collection)
            .map(|s| {
                s.entries
                    .iter()
                    .filter(|(c, _)| filter.matches(&c.metadata))
                    .count()
            })
            .unwrap_or(0))
    }

    async fn query(
        &self,
        collection: &str,
        query: &Embedding,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, DomainError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;

        let mut results: Vec<RetrievedChunk> = store
            .entries
            .iter()
            .map(|(chunk, embedding)| RetrievedChunk {
                chunk: chunk.clone(),
                distance: query.cosine_distance(embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);
        Ok(results)
    }
}
