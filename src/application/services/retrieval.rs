use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::Collection;
use crate::domain::{ports::RelevanceRater, DomainError, RelevanceRating, RetrievedChunk};

#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub distance_threshold: f32,
    pub min_rating: u8,
    pub retry_delay: Duration,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            distance_threshold: 1.0,
            min_rating: 5,
            retry_delay: Duration::from_secs(50),
        }
    }
}

pub fn context_part(result: &RetrievedChunk) -> String {
    format!("Document: {}\n{}", result.chunk.source(), result.chunk.text)
}

/// Two-stage relevance filter in front of the answer generator.
///
/// The cheap stage rejects when no result is within `distance_threshold`.
/// Otherwise the relevance judge scores the whole retrieved set and the
/// context is used only if the score reaches `min_rating`.
pub struct RetrievalGate {
    rater: Arc<dyn RelevanceRater>,
    settings: RetrievalSettings,
}

impl RetrievalGate {
    pub fn new(rater: Arc<dyn RelevanceRater>, settings: RetrievalSettings) -> Self {
        Self { rater, settings }
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    #[instrument(skip(self, collection), fields(collection = collection.name()))]
    pub async fn retrieve(&self, query: &str, collection: &Collection) -> Option<String> {
        match self.try_retrieve(query, collection).await {
            Ok(context) => context,
            Err(e) => {
                warn!(error = %e, "retrieval failed, answering without context");
                None
            }
        }
    }

    pub async fn try_retrieve(
        &self,
        query: &str,
        collection: &Collection,
    ) -> Result<Option<String>, DomainError> {
        let results = collection.query(query, self.settings.top_k).await?;

        let nearest = results
            .iter()
            .map(|r| r.distance)
            .fold(f32::INFINITY, f32::min);
        if nearest >= self.settings.distance_threshold {
            debug!(
                nearest,
                threshold = self.settings.distance_threshold,
                "distance gate rejected results"
            );
            return Ok(None);
        }

        let context_parts: Vec<String> = results.iter().map(context_part).collect();

        let rating = self.rate_with_retry(query, &context_parts).await?;
        if !rating.is_valid() || rating.rating < self.settings.min_rating {
            debug!(
                rating = rating.rating,
                min_rating = self.settings.min_rating,
                "rating gate rejected context"
            );
            return Ok(None);
        }

        debug!(
            rating = rating.rating,
            prompt_tokens = rating.prompt_tokens,
            parts = context_parts.len(),
            "context accepted"
        );
        Ok(Some(context_parts.join("\n\n")))
    }

    /// Retries indefinitely while the judge reports a transient failure.
    async fn rate_with_retry(
        &self,
        query: &str,
        context_parts: &[String],
    ) -> Result<RelevanceRating, DomainError> {
        let mut attempt: u32 = 1;
        loop {
            match self.rater.rate(query, context_parts).await {
                Err(e) if e.is_transient() => {
                    warn!(
                        error = %e,
                        attempt,
                        delay_secs = self.settings.retry_delay.as_secs_f64(),
                        "relevance rating throttled, retrying"
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
