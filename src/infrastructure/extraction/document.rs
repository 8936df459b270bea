use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::{ports::TextExtractor, DomainError, SourceDocument};

#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentTextExtractor;

impl DocumentTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn pdf_text(name: &str, data: &[u8]) -> Result<String, DomainError> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| DomainError::validation(format!("{name}: failed to load PDF: {e}")))?;

    let mut text = String::new();
    for page_num in doc.get_pages().into_keys() {
        match doc.extract_text(&[page_num]) {
            Ok(page) => text.push_str(&page),
            Err(e) => warn!(source = name, page = page_num, error = %e, "page has no extractable text"),
        }
    }
    Ok(text)
}

#[async_trait]
impl TextExtractor for DocumentTextExtractor {
    async fn extract(&self, document: &SourceDocument) -> Result<String, DomainError> {
        let not_found = |e: std::io::Error| match e.kind() {
            std::io::ErrorKind::NotFound => {
                DomainError::not_found(format!("source document {}", document.path.display()))
            }
            _ => DomainError::internal(format!("{}: {e}", document.path.display())),
        };

        let text = if document.extension().as_deref() == Some("pdf") {
            let data = tokio::fs::read(&document.path).await.map_err(not_found)?;
            let name = document.name.clone();
            tokio::task::spawn_blocking(move || pdf_text(&name, &data))
                .await
                .map_err(|e| DomainError::internal(format!("pdf extraction task: {e}")))??
        } else {
            tokio::fs::read_to_string(&document.path)
                .await
                .map_err(not_found)?
        };

        debug!(source = %document.name, chars = text.chars().count(), "text extracted");
        Ok(text)
    }
}
