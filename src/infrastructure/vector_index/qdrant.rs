use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qdrant_client::qdrant::{
    value::Kind, Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder,
    Distance, Filter, PointStruct, SearchPointsBuilder, UpsertPointsBuilder, Value,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    ports::VectorIndex, Chunk, ChunkMetadata, DomainError, Embedding, MetadataFilter,
    RetrievedChunk,
};

pub struct QdrantVectorIndex {
    client: Qdrant,
}

impl QdrantVectorIndex {
    pub fn new(url: &str) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| DomainError::external(e.to_string()))?;
        Ok(Self { client })
    }

    /// Chunk ids are `{source}_{ordinal}` strings; Qdrant wants a UUID or an
    /// integer, so the point id is a name-based UUID of the chunk id.
    fn point_id(chunk_id: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes()).to_string()
    }

    fn filter(filter: &MetadataFilter) -> Filter {
        match filter {
            MetadataFilter::Source(source) => {
                Filter::must([Condition::matches(filter.key(), source.clone())])
            }
        }
    }

    fn point(chunk: &Chunk, embedding: &Embedding) -> Result<PointStruct, DomainError> {
        let payload: Payload = serde_json::json!({
            "chunk_id": chunk.id,
            "text": chunk.text,
            "source": chunk.metadata.source,
            "chunk": chunk.metadata.chunk,
            "last_modified": chunk.metadata.last_modified.to_rfc3339(),
            "added": chunk.metadata.added.to_rfc3339(),
        })
        .try_into()
        .map_err(|_| DomainError::internal("Failed to create payload"))?;

        Ok(PointStruct::new(
            Self::point_id(&chunk.id),
            embedding.as_slice().to_vec(),
            payload,
        ))
    }

    async fn write_points(
        &self,
        collection: &str,
        points: Vec<PointStruct>,
    ) -> Result<(), DomainError> {
        let count = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        debug!(collection, count, "points upserted");
        Ok(())
    }

    async fn exists(&self, collection: &str) -> Result<bool, DomainError> {
        self.client
            .collection_exists(collection)
            .await
            .map_err(|e| DomainError::external(e.to_string()))
    }
}

fn payload_str<'a>(payload: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    match payload.get(key)?.kind.as_ref()? {
        Kind::StringValue(s) => Some(s.as_str()),
        _ => None,
    }
}

fn payload_time(payload: &HashMap<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(payload_str(payload, key)?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn chunk_from_payload(payload: &HashMap<String, Value>) -> Option<Chunk> {
    let chunk = match payload.get("chunk")?.kind.as_ref()? {
        Kind::IntegerValue(n) => usize::try_from(*n).ok()?,
        _ => return None,
    };
    Some(Chunk {
        id: payload_str(payload, "chunk_id")?.to_string(),
        text: payload_str(payload, "text")?.to_string(),
        metadata: ChunkMetadata {
            source: payload_str(payload, "source")?.to_string(),
            chunk,
            last_modified: payload_time(payload, "last_modified")?,
            added: payload_time(payload, "added")?,
        },
    })
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn create_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), DomainError> {
        if self.exists(collection).await? {
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        info!(collection, dimension, "qdrant collection created");
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        chunk: &Chunk,
        embedding: &Embedding,
    ) -> Result<(), DomainError> {
        self.write_points(collection, vec![Self::point(chunk, embedding)?])
            .await
    }

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
        if chunks.is_empty() {
            return Ok(());
        }

        let points = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| Self::point(chunk, embedding))
            .collect::<Result<Vec<_>, _>>()?;
        self.write_points(collection, points).await
    }

    async fn delete_where(
        &self,
        collection: &str,
        filter: &MetadataFilter,
    ) -> Result<(), DomainError> {
        if !self.exists(collection).await? {
            return Ok(());
        }

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(Self::filter(filter))
                    .wait(true),
            )
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        debug!(collection, ?filter, "points deleted");
        Ok(())
    }

    async fn count_where(
        &self,
        collection: &str,
        filter: &MetadataFilter,
    ) -> Result<usize, DomainError> {
        if !self.exists(collection).await? {
            return Ok(0);
        }

        let response = self
            .client
            .count(
                CountPointsBuilder::new(collection)
                    .filter(Self::filter(filter))
                    .exact(true),
            )
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    async fn query(
        &self,
        collection: &str,
        query: &Embedding,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, DomainError> {
        if !self.exists(collection).await? {
            return Err(DomainError::not_found(format!("collection {collection}")));
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, query.as_slice().to_vec(), k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        // Qdrant reports cosine similarity; smaller distance is closer.
        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                Some(RetrievedChunk {
                    chunk: chunk_from_payload(&point.payload)?,
                    distance: 1.0 - point.score,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_is_stable_per_chunk() {
        let a = QdrantVectorIndex::point_id("plan.pdf_0");
        assert_eq!(a, QdrantVectorIndex::point_id("plan.pdf_0"));
        assert_ne!(a, QdrantVectorIndex::point_id("plan.pdf_1"));
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_point_carries_chunk_payload() {
        let now = Utc::now();
        let chunk = Chunk::new(
            "Retire at 67.",
            ChunkMetadata {
                source: "plan.pdf".to_string(),
                chunk: 4,
                last_modified: now,
                added: now,
            },
        );

        let point = QdrantVectorIndex::point(&chunk, &Embedding::new(vec![0.1, 0.2])).unwrap();
        let restored = chunk_from_payload(&point.payload).unwrap();
        assert_eq!(restored.id, "plan.pdf_4");
        assert_eq!(restored.text, "Retire at 67.");
    }

    #[test]
    fn test_chunk_round_trips_through_payload() {
        let now = Utc::now();
        let payload: Payload = serde_json::json!({
            "chunk_id": "plan.pdf_2",
            "text": "Retire at 67.",
            "source": "plan.pdf",
            "chunk": 2,
            "last_modified": now.to_rfc3339(),
            "added": now.to_rfc3339(),
        })
        .try_into()
        .unwrap();
        let map: HashMap<String, Value> = payload.into();

        let chunk = chunk_from_payload(&map).unwrap();
        assert_eq!(chunk.id, "plan.pdf_2");
        assert_eq!(chunk.metadata.chunk, 2);
        assert_eq!(chunk.metadata.source, "plan.pdf");

        let mut broken = map.clone();
        broken.remove("text");
        assert!(chunk_from_payload(&broken).is_none());
    }
}
