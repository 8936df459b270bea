use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::gemini;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    ports::{LlmService, PriceSource},
    DomainError, Message,
};
use crate::infrastructure::config::{api_key_from_env, LlmConfig, GEMINI_KEY_VARS};
use crate::infrastructure::tools::StockPriceTool;

pub struct GeminiLlm {
    client: gemini::Client,
    model: String,
    timeout: Duration,
    max_tool_turns: usize,
}

impl GeminiLlm {
    pub fn new(api_key: &str, config: &LlmConfig) -> Result<Self, DomainError> {
        if api_key.trim().is_empty() {
            return Err(DomainError::config("Gemini API key must not be empty"));
        }
        let client = gemini::Client::new(api_key)
            .map_err(|e| DomainError::config(format!("gemini client: {e}")))?;

        Ok(Self {
            client,
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
            max_tool_turns: config.max_tool_turns.max(1),
        })
    }

    pub fn from_env(config: &LlmConfig) -> Result<Self, DomainError> {
        Self::new(&api_key_from_env(&GEMINI_KEY_VARS)?, config)
    }

    async fn run(&self, system: Option<&str>, prompt: &str) -> Result<String, DomainError> {
        let mut builder = self.client.agent(&self.model);
        if let Some(system) = system {
            builder = builder.preamble(system);
        }
        let agent = builder.build();

        tokio::time::timeout(self.timeout, agent.prompt(prompt))
            .await
            .map_err(|_| DomainError::timeout("Answer generation timed out"))?
            .map_err(|e| DomainError::external(format!("Gemini request failed: {e}")))
    }
}

#[async_trait]
impl LlmService for GeminiLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        self.run(None, prompt).await
    }

    async fn complete_with_system(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<String, DomainError> {
        self.run(Some(system), prompt).await
    }

    async fn chat(
        &self,
        system: &str,
        history: &[Message],
        message: &str,
    ) -> Result<String, DomainError> {
        self.run(Some(system), &fold_history(history, message)).await
    }

    async fn chat_with_prices(
        &self,
        system: &str,
        history: &[Message],
        message: &str,
        prices: Arc<dyn PriceSource>,
    ) -> Result<String, DomainError> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(system)
            .tool(StockPriceTool::new(prices))
            .build();

        let prompt = fold_history(history, message);
        tokio::time::timeout(
            self.timeout,
            agent.prompt(&prompt).multi_turn(self.max_tool_turns),
        )
        .await
        .map_err(|_| DomainError::timeout("Answer generation timed out"))?
        .map_err(|e| DomainError::external(format!("Gemini request failed: {e}")))
    }
}

fn fold_history(history: &[Message], message: &str) -> String {
    if history.is_empty() {
        return message.to_string();
    }

    let previous = history
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!("Previous conversation:\n{previous}\n\nCurrent message from user: {message}")
}
