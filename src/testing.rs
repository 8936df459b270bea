use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::{
    ports::{
        EmbeddingService, LlmService, PriceSource, RelevanceRater, TextExtractor, VectorIndex,
    },
    Chunk, DomainError, Embedding, Message, MetadataFilter, PriceQuote, RelevanceRating,
    RetrievedChunk, SourceDocument,
};

const KEYWORD_DIMENSION: usize = 64;

/// Bag-of-words embedding: each lowercase word bumps one hashed bucket.
pub struct KeywordEmbedding;

impl KeywordEmbedding {
    pub fn new() -> Self {
        Self
    }

    fn vector(text: &str) -> Embedding {
        let mut vec = vec![0.0f32; KEYWORD_DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
            vec[hash as usize % KEYWORD_DIMENSION] += 1.0;
        }
        Embedding::new(vec)
    }
}

#[async_trait]
impl EmbeddingService for KeywordEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        KEYWORD_DIMENSION
    }

    fn model(&self) -> &str {
        "keyword-hash"
    }
}

pub struct UnavailableEmbedding;

#[async_trait]
impl EmbeddingService for UnavailableEmbedding {
    async fn embed(&self, _text: &str) -> Result<Embedding, DomainError> {
        Err(DomainError::external("embedding provider rejected the API key"))
    }

    async fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        Err(DomainError::external("embedding provider rejected the API key"))
    }

    fn dimension(&self) -> usize {
        KEYWORD_DIMENSION
    }

    fn model(&self) -> &str {
        "unavailable"
    }
}

pub struct FixedIndex {
    results: Result<Vec<RetrievedChunk>, String>,
    pub queries: AtomicUsize,
}

impl FixedIndex {
    pub fn new(results: Vec<RetrievedChunk>) -> Self {
        Self {
            results: Ok(results),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn missing() -> Self {
        Self {
            results: Err("collection docs".to_string()),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for FixedIndex {
    async fn create_collection(&self, _: &str, _: usize) -> Result<(), DomainError> {
        Ok(())
    }

    async fn upsert(&self, _: &str, _: &Chunk, _: &Embedding) -> Result<(), DomainError> {
        Ok(())
    }

    async fn delete_where(&self, _: &str, _: &MetadataFilter) -> Result<(), DomainError> {
        Ok(())
    }

    async fn count_where(&self, _: &str, _: &MetadataFilter) -> Result<usize, DomainError> {
        Ok(self.results.as_ref().map(Vec::len).unwrap_or(0))
    }

    async fn query(
        &self,
        _: &str,
        _: &Embedding,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, DomainError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match &self.results {
            Ok(results) => Ok(results.iter().take(k).cloned().collect()),
            Err(msg) => Err(DomainError::not_found(msg.clone())),
        }
    }
}

pub struct ScriptedRater {
    script: Mutex<VecDeque<Result<RelevanceRating, DomainError>>>,
    fallback: u8,
    pub calls: AtomicUsize,
    pub last_context: Mutex<Vec<String>>,
}

impl ScriptedRater {
    pub fn always(rating: u8) -> Self {
        Self::scripted(Vec::new(), rating)
    }

    pub fn scripted(script: Vec<Result<RelevanceRating, DomainError>>, fallback: u8) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            last_context: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelevanceRater for ScriptedRater {
    async fn rate(&self, _query: &str, context: &[String]) -> Result<RelevanceRating, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock().unwrap() = context.to_vec();
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(RelevanceRating::new(self.fallback as i64, 100)))
    }
}

pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<(String, String)>>,
    pub histories: Mutex<Vec<Vec<Message>>>,
    pub price_calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            histories: Mutex::new(Vec::new()),
            price_calls: AtomicUsize::new(0),
        }
    }

    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn histories(&self) -> Vec<Vec<Message>> {
        self.histories.lock().unwrap().clone()
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    fn reply(&self, system: &str, prompt: &str) -> Result<String, DomainError> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), prompt.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DomainError::external("no scripted reply left"))
    }
}

#[async_trait]
impl LlmService for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        self.reply("", prompt)
    }

    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, DomainError> {
        self.reply(system, prompt)
    }

    async fn chat(
        &self,
        system: &str,
        history: &[Message],
        message: &str,
    ) -> Result<String, DomainError> {
        self.histories.lock().unwrap().push(history.to_vec());
        self.reply(system, message)
    }

    async fn chat_with_prices(
        &self,
        system: &str,
        history: &[Message],
        message: &str,
        _prices: Arc<dyn PriceSource>,
    ) -> Result<String, DomainError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        self.chat(system, history, message).await
    }
}

pub struct ScriptedPrices {
    closes: HashMap<String, f64>,
    requests: Mutex<Vec<(String, NaiveDate)>>,
}

impl ScriptedPrices {
    pub fn new<'a>(closes: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            closes: closes
                .into_iter()
                .map(|(t, c)| (t.to_string(), c))
                .collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(String, NaiveDate)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for ScriptedPrices {
    async fn closing_price(
        &self,
        ticker: &str,
        day: NaiveDate,
    ) -> Result<Option<PriceQuote>, DomainError> {
        self.requests.lock().unwrap().push((ticker.to_string(), day));
        Ok(self.closes.get(ticker).map(|&close| PriceQuote {
            ticker: ticker.to_string(),
            date: day,
            close,
        }))
    }
}

pub struct PagesExtractor {
    pages: Vec<String>,
}

impl PagesExtractor {
    pub fn new<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl TextExtractor for PagesExtractor {
    async fn extract(&self, _document: &SourceDocument) -> Result<String, DomainError> {
        Ok(self.pages.concat())
    }
}
