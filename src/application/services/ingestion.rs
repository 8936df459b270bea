use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use super::Collection;
use crate::domain::{
    ports::TextExtractor, Chunk, ChunkMetadata, DomainError, MetadataFilter, SourceDocument,
    TextSplitter,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub source: String,
    pub collection: String,
    pub chunks: usize,
    pub elapsed_ms: u64,
}

pub struct IngestionService {
    extractor: Arc<dyn TextExtractor>,
    docs_dir: PathBuf,
}

impl IngestionService {
    pub fn new(extractor: Arc<dyn TextExtractor>, docs_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            docs_dir: docs_dir.into(),
        }
    }

    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    /// Resolves `source_name` inside the documents directory. Only the file
    /// name component is used, so a source can never point outside it.
    pub async fn locate(&self, source_name: &str) -> Result<SourceDocument, DomainError> {
        let file_name = Path::new(source_name)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DomainError::validation(format!("invalid source name: {source_name}")))?;
        let path = self.docs_dir.join(file_name);

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) | Err(_) => {
                return Err(DomainError::not_found(format!(
                    "source document {}",
                    path.display()
                )))
            }
        };

        let last_modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(SourceDocument::new(file_name, path).with_last_modified(last_modified))
    }

    #[instrument(skip(self, collection, splitter), fields(collection = collection.name()))]
    pub async fn ingest(
        &self,
        source_name: &str,
        collection: &Collection,
        splitter: &TextSplitter,
    ) -> Result<IngestReport, DomainError> {
        let started = Instant::now();

        let document = self.locate(source_name).await?;
        let text = self.extractor.extract(&document).await?;
        let chunks = build_chunks(&document, splitter.split(&text), Utc::now());

        collection.ensure_exists().await?;
        collection
            .delete_where(&MetadataFilter::source(&document.name))
            .await?;
        collection.upsert_all(&chunks).await?;

        let report = IngestReport {
            source: document.name,
            collection: collection.name().to_string(),
            chunks: chunks.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            source = %report.source,
            chunks = report.chunks,
            elapsed_ms = report.elapsed_ms,
            "document ingested"
        );

        Ok(report)
    }
}

fn build_chunks(
    document: &SourceDocument,
    pieces: Vec<String>,
    added: DateTime<Utc>,
) -> Vec<Chunk> {
    pieces
        .into_iter()
        .enumerate()
        .map(|(ordinal, text)| {
            Chunk::new(
                text,
                ChunkMetadata {
                    source: document.name.clone(),
                    chunk: ordinal,
                    last_modified: document.last_modified,
                    added,
                },
            )
        })
        .collect()
}
