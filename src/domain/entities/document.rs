use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub name: String,
    pub path: PathBuf,
    pub last_modified: DateTime<Utc>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            last_modified: Utc::now(),
        }
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = last_modified;
        self
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
    }
}

pub fn chunk_id(source: &str, ordinal: usize) -> String {
    format!("{source}_{ordinal}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk: usize,
    pub last_modified: DateTime<Utc>,
    pub added: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            id: chunk_id(&metadata.source, metadata.chunk),
            text: text.into(),
            metadata,
        }
    }

    pub fn source(&self) -> &str {
        &self.metadata.source
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataFilter {
    Source(String),
}

impl MetadataFilter {
    pub fn source(name: impl Into<String>) -> Self {
        Self::Source(name.into())
    }

    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        match self {
            Self::Source(source) => metadata.source == *source,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Source(_) => "source",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(source: &str, chunk: usize) -> ChunkMetadata {
        let now = Utc::now();
        ChunkMetadata {
            source: source.to_string(),
            chunk,
            last_modified: now,
            added: now,
        }
    }

    #[test]
    fn test_chunk_id_combines_source_and_ordinal() {
        let chunk = Chunk::new("text", metadata("a.pdf", 3));
        assert_eq!(chunk.id, "a.pdf_3");
        assert_eq!(chunk.source(), "a.pdf");
    }

    #[test]
    fn test_filter_matches_source_only() {
        let filter = MetadataFilter::source("a.pdf");
        assert!(filter.matches(&metadata("a.pdf", 0)));
        assert!(!filter.matches(&metadata("b.pdf", 0)));
    }

    #[test]
    fn test_extension_is_lowercased() {
        let doc = SourceDocument::new("Plan.PDF", "/tmp/Plan.PDF");
        assert_eq!(doc.extension().as_deref(), Some("pdf"));
        assert_eq!(SourceDocument::new("README", "/tmp/README").extension(), None);
    }
}
