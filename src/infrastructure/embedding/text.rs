use async_trait::async_trait;
use rig::client::EmbeddingsClient;
use rig::embeddings::EmbeddingModel;
use rig::providers::openai;
use tracing::debug;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::{api_key_from_env, EmbeddingConfig, OPENAI_KEY_VARS};

const BATCH_SIZE: usize = 256;

pub struct TextEmbedding {
    client: openai::Client,
    model: String,
    dimension: usize,
}

impl TextEmbedding {
    pub fn new(api_key: &str, config: &EmbeddingConfig) -> Result<Self, DomainError> {
        if api_key.trim().is_empty() {
            return Err(DomainError::config("OpenAI API key must not be empty"));
        }
        let client = openai::Client::new(api_key)
            .map_err(|e| DomainError::config(format!("openai client: {e}")))?;

        Ok(Self {
            client,
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }

    pub fn from_env(config: &EmbeddingConfig) -> Result<Self, DomainError> {
        Self::new(&api_key_from_env(&OPENAI_KEY_VARS)?, config)
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    fn to_embedding(&self, vec: Vec<f64>) -> Result<Embedding, DomainError> {
        if vec.len() != self.dimension {
            return Err(DomainError::external(format!(
                "model {} returned {} dimensions, expected {}",
                self.model,
                vec.len(),
                self.dimension
            )));
        }
        Ok(Embedding::new(vec.into_iter().map(|x| x as f32).collect()))
    }
}

#[async_trait]
impl EmbeddingService for TextEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| DomainError::internal("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.client.embedding_model(&self.model);

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let documents: Vec<String> = batch.iter().map(|t| t.to_string()).collect();
            let vectors = model
                .embed_texts(documents)
                .await
                .map_err(|e| DomainError::external(format!("embedding failed: {e}")))?;
            if vectors.len() != batch.len() {
                return Err(DomainError::external(format!(
                    "requested {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            for vector in vectors {
                embeddings.push(self.to_embedding(vector.vec)?);
            }
        }

        debug!(model = %self.model, count = embeddings.len(), "texts embedded");
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_is_config_error() {
        let config = EmbeddingConfig::default();
        assert!(matches!(
            TextEmbedding::new("  ", &config),
            Err(DomainError::Config(_))
        ));

        let embedding = TextEmbedding::new("sk-test", &config).unwrap();
        assert_eq!(embedding.dimension(), 1536);
        assert_eq!(embedding.model(), "text-embedding-3-small");
    }

    #[test]
    fn test_wrong_dimension_is_rejected() {
        let embedding = TextEmbedding::new("sk-test", &EmbeddingConfig::default())
            .unwrap()
            .with_dimension(3);
        assert!(embedding.to_embedding(vec![0.1, 0.2, 0.3]).is_ok());
        assert!(matches!(
            embedding.to_embedding(vec![0.1, 0.2]),
            Err(DomainError::ExternalService(_))
        ));
    }
}
