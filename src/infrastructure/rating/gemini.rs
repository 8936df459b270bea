use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error};

use crate::domain::{ports::RelevanceRater, DomainError, RelevanceRating};
use crate::infrastructure::config::{
    api_key_from_env, RatingConfig, RatingPromptConfig, GEMINI_KEY_VARS,
};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiRelevanceRater {
    client: reqwest::Client,
    api_key: String,
    model: String,
    instruction: String,
}

impl GeminiRelevanceRater {
    pub fn new(
        api_key: impl Into<String>,
        config: &RatingConfig,
        prompt: &RatingPromptConfig,
    ) -> Result<Self, DomainError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(DomainError::config("Gemini API key must not be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| DomainError::config(format!("http client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            instruction: prompt.instruction.clone(),
        })
    }

    pub fn from_env(config: &RatingConfig, prompt: &RatingPromptConfig) -> Result<Self, DomainError> {
        Self::new(api_key_from_env(&GEMINI_KEY_VARS)?, config, prompt)
    }

    fn prompt(&self, query: &str, context: &[String]) -> String {
        format!(
            "Query: {query}\n\nRetrieved chunks:\n{}\n\n{}",
            context.join("\n\n"),
            self.instruction
        )
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
}

#[derive(Serialize, Deserialize)]
struct RatingReply {
    rating: i64,
}

fn parse_rating(body: &str) -> RelevanceRating {
    let Ok(response) = serde_json::from_str::<GenerateResponse>(body) else {
        return RelevanceRating::invalid(0);
    };
    let prompt_tokens = response
        .usage_metadata
        .map(|u| u.prompt_token_count)
        .unwrap_or(0);

    let rating = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .and_then(|text| serde_json::from_str::<RatingReply>(text.trim()).ok());

    match rating {
        Some(reply) => RelevanceRating::new(reply.rating, prompt_tokens),
        None => RelevanceRating::invalid(prompt_tokens),
    }
}

fn is_throttled(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::SERVICE_UNAVAILABLE
}

#[async_trait]
impl RelevanceRater for GeminiRelevanceRater {
    async fn rate(&self, query: &str, context: &[String]) -> Result<RelevanceRating, DomainError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": self.prompt(query, context) }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": { "rating": { "type": "INTEGER" } },
                    "required": ["rating"]
                }
            }
        });

        let response = self
            .client
            .post(format!("{GEMINI_API_BASE}/{}:generateContent", self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    DomainError::rate_limited(format!("rating request failed: {e}"))
                } else {
                    DomainError::external(format!("rating request failed: {e}"))
                }
            })?;

        let status = response.status();
        if is_throttled(status) {
            return Err(DomainError::rate_limited(format!("Gemini returned {status}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(%status, "rating request rejected");
            return Err(DomainError::external(format!(
                "Gemini returned {status}: {detail}"
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| DomainError::external(format!("rating response: {e}")))?;
        let rating = parse_rating(&text);
        debug!(
            rating = rating.rating,
            prompt_tokens = rating.prompt_tokens,
            "context rated"
        );
        Ok(rating)
    }
}
