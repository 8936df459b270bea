use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{assemble_prompt_with, Collection, RetrievalGate, DEFAULT_INSTRUCTION};
use crate::domain::{
    actuarial::{estimate_health_cost, estimate_longevity},
    ports::{LlmService, PriceSource},
    ChatSession, DomainError, Intent, Message, MessageRole, ReportKind, UserProfile,
};

pub const PROFILE_SAVED_MESSAGE: &str =
    "Your profile has been saved. You can now ask for a retirement, portfolio, longevity or health report.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPrompts {
    pub profile_collection: String,
    pub assistant: String,
    pub portfolio: String,
    pub report: String,
    pub intent_classifier: String,
    pub context_instruction: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            profile_collection: "Collect the user's retirement-planning profile one question at a time. \
When every field is known, reply with the profile as a ```json block."
                .to_string(),
            assistant: "You are a concise retirement-planning assistant.".to_string(),
            portfolio: "You are a financial assistant. Only answer questions about the user's \
stock holdings and portfolio value."
                .to_string(),
            report: "Write the requested report for the user based on their profile.".to_string(),
            intent_classifier: "Classify the user's message. Respond with exactly one label."
                .to_string(),
            context_instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub intent: Option<Intent>,
    pub used_context: bool,
    pub profile_completed: bool,
}

enum Route<'a> {
    ProfileSummary,
    Answer {
        preamble: &'a str,
        extra: Option<String>,
        retrieve: bool,
        price_lookup: bool,
    },
}

pub struct ChatService {
    llm: Arc<dyn LlmService>,
    gate: Arc<RetrievalGate>,
    collection: Collection,
    prices: Arc<dyn PriceSource>,
    prompts: ChatPrompts,
    history_window: usize,
}

impl ChatService {
    pub fn new(
        llm: Arc<dyn LlmService>,
        gate: Arc<RetrievalGate>,
        collection: Collection,
        prices: Arc<dyn PriceSource>,
        prompts: ChatPrompts,
    ) -> Self {
        Self {
            llm,
            gate,
            collection,
            prices,
            prompts,
            history_window: 20,
        }
    }

    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window;
        self
    }

    #[instrument(skip(self, session, message), fields(user_id = %session.user_id))]
    pub async fn handle_turn(
        &self,
        session: &mut ChatSession,
        message: &str,
    ) -> Result<ChatReply, DomainError> {
        let history = session.recent(self.history_window).to_vec();
        session.add_message(MessageRole::User, message);

        let reply = match session.profile.profile().cloned() {
            None => self.collect_profile(session, &history, message).await?,
            Some(profile) => self.answer(&profile, &history, message).await?,
        };

        session.add_message(MessageRole::Assistant, &reply.reply);
        Ok(reply)
    }

    async fn collect_profile(
        &self,
        session: &mut ChatSession,
        history: &[Message],
        message: &str,
    ) -> Result<ChatReply, DomainError> {
        let raw = self
            .llm
            .chat(&self.prompts.profile_collection, history, message)
            .await?;

        if session.profile.advance(&raw) {
            info!(user_id = %session.user_id, "profile completed");
            return Ok(ChatReply {
                reply: PROFILE_SAVED_MESSAGE.to_string(),
                intent: None,
                used_context: false,
                profile_completed: true,
            });
        }

        Ok(ChatReply {
            reply: raw,
            intent: None,
            used_context: false,
            profile_completed: false,
        })
    }

    async fn answer(
        &self,
        profile: &UserProfile,
        history: &[Message],
        message: &str,
    ) -> Result<ChatReply, DomainError> {
        let intent = self.classify(message).await;

        let (preamble, extra, retrieve, price_lookup) = match self.route(intent, profile) {
            Route::ProfileSummary => {
                return Ok(ChatReply {
                    reply: profile.summary(),
                    intent: Some(intent),
                    used_context: false,
                    profile_completed: false,
                })
            }
            Route::Answer {
                preamble,
                extra,
                retrieve,
                price_lookup,
            } => (preamble, extra, retrieve, price_lookup),
        };

        let mut system = format!("{preamble}\n\nUser profile:\n{}", profile.summary());
        if let Some(extra) = extra {
            system.push_str("\n\n");
            system.push_str(&extra);
        }

        let context = if retrieve {
            self.gate.retrieve(message, &self.collection).await
        } else {
            None
        };
        let prompt =
            assemble_prompt_with(&self.prompts.context_instruction, message, context.as_deref());

        let reply = if price_lookup {
            self.llm
                .chat_with_prices(&system, history, &prompt, self.prices.clone())
                .await?
        } else {
            self.llm.chat(&system, history, &prompt).await?
        };
        Ok(ChatReply {
            reply,
            intent: Some(intent),
            used_context: context.is_some(),
            profile_completed: false,
        })
    }

    /// One classification call; failures fall back to `General`.
    async fn classify(&self, message: &str) -> Intent {
        let prompt = format!(
            "Labels: {}\nMessage: \"{message}\"\nLabel:",
            Intent::LABELS.join(", ")
        );
        match self
            .llm
            .complete_with_system(&self.prompts.intent_classifier, &prompt)
            .await
        {
            Ok(label) => Intent::from_label(&label),
            Err(e) => {
                warn!(error = %e, "intent classification failed");
                Intent::General
            }
        }
    }

    fn route(&self, intent: Intent, profile: &UserProfile) -> Route<'_> {
        match intent {
            Intent::Profile => Route::ProfileSummary,
            Intent::Portfolio => Route::Answer {
                preamble: &self.prompts.portfolio,
                extra: Some(format!("Holdings: {}", profile.assets)),
                retrieve: false,
                price_lookup: true,
            },
            Intent::Report(kind) => Route::Answer {
                preamble: &self.prompts.report,
                extra: Some(report_brief(kind, profile)),
                retrieve: true,
                price_lookup: kind == ReportKind::Portfolio,
            },
            Intent::General => Route::Answer {
                preamble: &self.prompts.assistant,
                extra: None,
                retrieve: true,
                price_lookup: false,
            },
        }
    }
}

fn report_brief(kind: ReportKind, profile: &UserProfile) -> String {
    let request = format!("Requested report: {}", kind.as_str());
    match kind {
        ReportKind::Longevity => format!("{request}

{}", estimate_longevity(profile).render()),
        ReportKind::Health => format!("{request}

{}", estimate_health_cost(profile).render()),
        ReportKind::Portfolio => format!("{request}

Holdings: {}", profile.assets),
        ReportKind::Retirement => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::RetrievalSettings;
    use crate::domain::{Chunk, ChunkMetadata, ProfileState, RetrievedChunk, PROFILE_JSON};
    use crate::testing::{FixedIndex, KeywordEmbedding, ScriptedLlm, ScriptedPrices, ScriptedRater};
    use chrono::Utc;

    fn service(llm: Arc<ScriptedLlm>, rater: Arc<ScriptedRater>) -> ChatService {
        let now = Utc::now();
        let index = Arc::new(FixedIndex::new(vec![RetrievedChunk {
            chunk: Chunk::new(
                "Full benefits start at 67.",
                ChunkMetadata {
                    source: "ssa.pdf".to_string(),
                    chunk: 0,
                    last_modified: now,
                    added: now,
                },
            ),
            distance: 0.3,
        }]));
        let collection = Collection::new("docs", Arc::new(KeywordEmbedding::new()), index);
        let gate = Arc::new(RetrievalGate::new(rater, RetrievalSettings::default()));
        let prices = Arc::new(ScriptedPrices::new([("AAPL", 196.25)]));
        ChatService::new(llm, gate, collection, prices, ChatPrompts::default())
    }

    fn completed_session() -> ChatSession {
        let mut session = ChatSession::new("user-1");
        session.profile = ProfileState::Complete {
            profile: UserProfile::from_reply(PROFILE_JSON).unwrap(),
        };
        session
    }

    #[tokio::test]
    async fn test_profile_collection_until_json_reply() {
        let llm = Arc::new(ScriptedLlm::new([
            "Nice to meet you! How old are you?".to_string(),
            format!("Thanks!\n```json\n{PROFILE_JSON}\n```"),
        ]));
        let chat = service(llm.clone(), Arc::new(ScriptedRater::always(9)));
        let mut session = ChatSession::new("user-1");

        let first = chat.handle_turn(&mut session, "Hi, I'm Onat").await.unwrap();
        assert_eq!(first.reply, "Nice to meet you! How old are you?");
        assert!(!session.profile.is_complete());

        let second = chat.handle_turn(&mut session, "I'm 28").await.unwrap();
        assert!(second.profile_completed);
        assert_eq!(second.reply, PROFILE_SAVED_MESSAGE);
        assert!(session.profile.is_complete());
        assert_eq!(session.messages.len(), 4);
        assert_eq!(llm.prompts()[0].0, ChatPrompts::default().profile_collection);

        let histories = llm.histories();
        assert!(histories[0].is_empty());
        let contents: Vec<&str> = histories[1].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["Hi, I'm Onat", "Nice to meet you! How old are you?"]);
        assert_eq!(histories[1][0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_history_window_limits_prior_turns() {
        let llm = Arc::new(ScriptedLlm::new(["What is your name?", "How old are you?", "Where do you live?"]));
        let chat = service(llm.clone(), Arc::new(ScriptedRater::always(9))).with_history_window(3);
        let mut session = ChatSession::new("user-1");

        for message in ["hello", "Onat", "28"] {
            chat.handle_turn(&mut session, message).await.unwrap();
        }

        let histories = llm.histories();
        assert_eq!(histories[2].len(), 3);
        assert_eq!(histories[2][0].content, "What is your name?");
        assert_eq!(histories[2][2].content, "How old are you?");
    }

    #[tokio::test]
    async fn test_general_intent_uses_retrieved_context() {
        let llm = Arc::new(ScriptedLlm::new(["general", "You can retire at 67."]));
        let rater = Arc::new(ScriptedRater::always(8));
        let chat = service(llm.clone(), rater.clone());
        let mut session = completed_session();

        let reply = chat
            .handle_turn(&mut session, "When do full benefits start?")
            .await
            .unwrap();

        assert_eq!(reply.intent, Some(Intent::General));
        assert!(reply.used_context);
        assert_eq!(reply.reply, "You can retire at 67.");

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].0.contains("Name: Onat Keser"));
        assert!(prompts[1]
            .1
            .contains("Context:\nDocument: ssa.pdf\nFull benefits start at 67."));
        assert!(prompts[1].1.ends_with("Query: When do full benefits start?\n\nAnswer:"));
    }

    #[tokio::test]
    async fn test_rejected_context_sends_bare_query() {
        let llm = Arc::new(ScriptedLlm::new(["health_report", "Here is your report."]));
        let chat = service(llm.clone(), Arc::new(ScriptedRater::always(2)));
        let mut session = completed_session();

        let reply = chat
            .handle_turn(&mut session, "Give me my health report")
            .await
            .unwrap();

        assert_eq!(
            reply.intent,
            Some(Intent::Report(crate::domain::ReportKind::Health))
        );
        assert!(!reply.used_context);
        let prompts = llm.prompts();
        assert_eq!(prompts[1].1, "Give me my health report");
        assert!(prompts[1].0.contains("Requested report: health"));
        assert!(prompts[1].0.contains("Estimated annual health cost: $1843.41"));
        assert_eq!(llm.price_calls(), 0);
    }

    #[tokio::test]
    async fn test_longevity_report_carries_estimate() {
        let llm = Arc::new(ScriptedLlm::new(["longevity_report", "Your outlook is good."]));
        let chat = service(llm.clone(), Arc::new(ScriptedRater::always(9)));
        let mut session = completed_session();

        chat.handle_turn(&mut session, "How long will I live?")
            .await
            .unwrap();

        let system = &llm.prompts()[1].0;
        assert!(system.contains("Requested report: longevity"));
        assert!(system.contains("Expected lifespan: 73 years"));
        assert!(system.contains("Risk score: 10/100"));
    }

    #[tokio::test]
    async fn test_profile_intent_answers_without_generation() {
        let llm = Arc::new(ScriptedLlm::new(["profile"]));
        let rater = Arc::new(ScriptedRater::always(9));
        let chat = service(llm.clone(), rater.clone());
        let mut session = completed_session();

        let reply = chat.handle_turn(&mut session, "Show my profile").await.unwrap();

        assert_eq!(reply.intent, Some(Intent::Profile));
        assert!(reply.reply.contains("Name: Onat Keser"));
        assert_eq!(llm.prompts().len(), 1);
        assert_eq!(rater.calls(), 0);
    }

    #[tokio::test]
    async fn test_portfolio_intent_skips_retrieval() {
        let llm = Arc::new(ScriptedLlm::new(["portfolio", "You own 20 AAPL shares."]));
        let rater = Arc::new(ScriptedRater::always(9));
        let chat = service(llm.clone(), rater.clone());
        let mut session = completed_session();

        let reply = chat
            .handle_turn(&mut session, "What stocks do I own?")
            .await
            .unwrap();

        assert_eq!(reply.intent, Some(Intent::Portfolio));
        assert_eq!(rater.calls(), 0);
        assert_eq!(llm.price_calls(), 1);
        assert!(llm.prompts()[1].0.contains("Holdings: 20 shares of Apple stock"));
    }
}
