use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::{ChatPrompts, RetrievalSettings};
use crate::domain::{splitter::DEFAULT_SEPARATORS, DomainError, TextSplitter};

pub const DEFAULT_CONFIG_DIR: &str = "config";

pub const GEMINI_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];
pub const OPENAI_KEY_VARS: [&str; 1] = ["OPENAI_API_KEY"];

pub fn api_key_from_env(names: &[&str]) -> Result<String, DomainError> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
        .ok_or_else(|| {
            DomainError::config(format!("{} environment variable not set", names.join(" or ")))
        })
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, DomainError> {
        let dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
        let mut config = Self::load_from(&dir)?;
        config.config.apply_env();
        config.config.validate()?;
        Ok(config)
    }

    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let dir = dir.as_ref();
        Ok(Self {
            config: read_yaml(&dir.join("config.yaml"))?,
            prompts: read_yaml(&dir.join("prompts.yaml"))?,
        })
    }
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, DomainError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DomainError::config(format!("{}: {e}", path.display())))?;
    serde_yaml::from_str(&raw).map_err(|e| DomainError::config(format!("{}: {e}", path.display())))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rating: RatingConfig,
    pub rag: RagConfig,
    pub storage: StorageConfig,
    pub worker: WorkerConfig,
    pub prices: PricesConfig,
    pub cors: CorsConfig,
}

impl Config {
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.storage.redis_url = url;
        }
        if let Ok(url) = std::env::var("QDRANT_URL") {
            self.storage.qdrant_url = Some(url);
        }
        if let Ok(path) = std::env::var("DOCS_PATH") {
            self.storage.docs_path = PathBuf::from(path);
        }
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.rag.chunk_size == 0 {
            return Err(DomainError::config("rag.chunk_size must be positive"));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(DomainError::config(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }
        if self.rag.top_k == 0 {
            return Err(DomainError::config("rag.top_k must be positive"));
        }
        if self.rag.min_rating > 10 {
            return Err(DomainError::config("rag.min_rating must be at most 10"));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn splitter(&self) -> Result<TextSplitter, DomainError> {
        TextSplitter::with_separators(
            self.rag.chunk_size,
            self.rag.chunk_overlap,
            self.rag.separators.clone(),
        )
    }

    pub fn retrieval_settings(&self) -> RetrievalSettings {
        RetrievalSettings {
            top_k: self.rag.top_k,
            distance_threshold: self.rag.distance_threshold,
            min_rating: self.rag.min_rating,
            retry_delay: Duration::from_secs(self.rating.retry_delay_seconds),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub timeout_seconds: u64,
    pub history_window: usize,
    pub max_tool_turns: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            timeout_seconds: 60,
            history_window: 20,
            max_tool_turns: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub model: String,
    pub retry_delay_seconds: u64,
    pub timeout_seconds: u64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            retry_delay_seconds: 50,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub collection: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
    pub top_k: usize,
    pub distance_threshold: f32,
    pub min_rating: u8,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            collection: "pdf_collection".to_string(),
            chunk_size: 1000,
            chunk_overlap: 100,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
            top_k: 5,
            distance_threshold: 1.0,
            min_rating: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub redis_url: String,
    /// In-memory index when unset.
    pub qdrant_url: Option<String>,
    pub docs_path: PathBuf,
    pub session_ttl_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            qdrant_url: None,
            docs_path: PathBuf::from("docs"),
            session_ttl_seconds: 7 * 24 * 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub poll_timeout_seconds: f64,
    pub result_ttl_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            poll_timeout_seconds: 5.0,
            result_ttl_seconds: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricesConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for PricesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub chat: ChatPromptsConfig,
    pub rating: RatingPromptConfig,
}

impl PromptsConfig {
    pub fn chat_prompts(&self) -> ChatPrompts {
        ChatPrompts {
            profile_collection: self.chat.profile_collection.clone(),
            assistant: self.chat.assistant.clone(),
            portfolio: self.chat.portfolio.clone(),
            report: self.chat.report.clone(),
            intent_classifier: self.chat.intent_classifier.clone(),
            context_instruction: self.chat.context_instruction.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatPromptsConfig {
    pub profile_collection: String,
    pub assistant: String,
    pub portfolio: String,
    pub report: String,
    pub intent_classifier: String,
    pub context_instruction: String,
}

impl Default for ChatPromptsConfig {
    fn default() -> Self {
        let d = ChatPrompts::default();
        Self {
            profile_collection: d.profile_collection,
            assistant: d.assistant,
            portfolio: d.portfolio,
            report: d.report,
            intent_classifier: d.intent_classifier,
            context_instruction: d.context_instruction,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatingPromptConfig {
    pub instruction: String,
}

impl Default for RatingPromptConfig {
    fn default() -> Self {
        Self {
            instruction: "On a scale from 1-10, rate how relevant these chunks are to the query."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();

        let settings = config.retrieval_settings();
        assert_eq!(settings.top_k, 5);
        assert_eq!(settings.min_rating, 5);
        assert_eq!(settings.retry_delay, Duration::from_secs(50));
        assert_eq!(config.rag.collection, "pdf_collection");
    }

    #[test]
    fn test_validate_rejects_bad_chunking() {
        let mut config = Config::default();
        config.rag.chunk_overlap = config.rag.chunk_size;
        assert!(matches!(config.validate(), Err(DomainError::Config(_))));

        let mut config = Config::default();
        config.rag.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rag.min_rating = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str(
            r#"
rag:
  chunk_size: 500
  chunk_overlap: 50
storage:
  qdrant_url: "http://localhost:6334"
"#,
        )
        .unwrap();

        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.storage.qdrant_url.as_deref(), Some("http://localhost:6334"));
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.splitter().unwrap().chunk_size(), 500);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yaml"), "rag:\n  top_k: 3\n").unwrap();
        std::fs::write(
            dir.path().join("prompts.yaml"),
            "chat:\n  assistant: \"Be brief.\"\n",
        )
        .unwrap();

        let app = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(app.config.rag.top_k, 3);
        assert_eq!(app.prompts.chat_prompts().assistant, "Be brief.");
        assert_eq!(
            app.prompts.chat.context_instruction,
            ChatPrompts::default().context_instruction
        );
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let app = AppConfig::load_from(concat!(env!("CARGO_MANIFEST_DIR"), "/config")).unwrap();
        app.config.validate().unwrap();
        assert_eq!(app.config.rag.separators, DEFAULT_SEPARATORS);
        assert_eq!(app.config.rating.retry_delay_seconds, 50);
        assert_eq!(app.config.llm.max_tool_turns, 4);
        assert!(app.config.prices.base_url.starts_with("https://"));
        assert!(app.prompts.chat.portfolio.contains("stock_price"));
        assert!(app.prompts.chat.profile_collection.contains("```json"));
    }

    #[test]
    fn test_unset_api_key_is_config_error() {
        let err = api_key_from_env(&["RETIREMENT_RAG_UNSET_KEY_A", "RETIREMENT_RAG_UNSET_KEY_B"])
            .unwrap_err();
        assert!(matches!(err, DomainError::Config(_)));
        assert!(err
            .to_string()
            .contains("RETIREMENT_RAG_UNSET_KEY_A or RETIREMENT_RAG_UNSET_KEY_B"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppConfig::load_from(dir.path()),
            Err(DomainError::Config(_))
        ));
    }
}
