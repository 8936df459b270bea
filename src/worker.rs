use deadpool_redis::{redis::AsyncCommands, Config, Connection, Pool, Runtime};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use retirement_rag::application::{ChatService, Collection, IngestionService, RetrievalGate};
use retirement_rag::domain::{ports::SessionStore, ChatSession, TextSplitter};
use retirement_rag::infrastructure::{
    bootstrap, keys, queues, AppConfig, DocumentTextExtractor, GeminiLlm, GeminiRelevanceRater,
    IngestDocumentJob, JobResult, ProcessChatJob, QueuedJob, RedisSessionStore, YahooPriceSource,
};

pub type RedisPool = Pool;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Redis pool error: {0}")]
    Pool(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Processing error: {0}")]
    Processing(String),
}

pub type Result<T> = std::result::Result<T, WorkerError>;

pub fn create_pool(redis_url: &str) -> Result<RedisPool> {
    let cfg = Config::from_url(redis_url);
    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| WorkerError::Pool(e.to_string()))
}

pub struct WorkerState {
    pub redis_pool: RedisPool,
    pub chat: ChatService,
    pub sessions: Arc<dyn SessionStore>,
    pub ingestion: IngestionService,
    pub collection: Collection,
    pub splitter: TextSplitter,
    pub result_ttl_seconds: u64,
    pub poll_timeout_seconds: f64,
}

impl WorkerState {
    pub fn new(redis_pool: RedisPool, app: &AppConfig) -> anyhow::Result<Self> {
        let config = &app.config;
        let collection = bootstrap::collection(config)?;

        let rater = Arc::new(GeminiRelevanceRater::from_env(
            &config.rating,
            &app.prompts.rating,
        )?);
        let gate = Arc::new(RetrievalGate::new(rater, config.retrieval_settings()));
        let llm = Arc::new(GeminiLlm::from_env(&config.llm)?);
        let prices = Arc::new(YahooPriceSource::new(&config.prices)?);
        let chat = ChatService::new(
            llm,
            gate,
            collection.clone(),
            prices,
            app.prompts.chat_prompts(),
        )
        .with_history_window(config.llm.history_window);

        let sessions: Arc<dyn SessionStore> = Arc::new(RedisSessionStore::new(
            redis_pool.clone(),
            config.storage.session_ttl_seconds,
        ));
        let ingestion = IngestionService::new(
            Arc::new(DocumentTextExtractor::new()),
            config.storage.docs_path.clone(),
        );

        Ok(Self {
            redis_pool,
            chat,
            sessions,
            ingestion,
            collection,
            splitter: config.splitter()?,
            result_ttl_seconds: config.worker.result_ttl_seconds,
            poll_timeout_seconds: config.worker.poll_timeout_seconds,
        })
    }
}

pub struct JobConsumer {
    state: Arc<WorkerState>,
    concurrency: usize,
}

impl JobConsumer {
    pub fn new(state: WorkerState, concurrency: usize) -> Self {
        Self {
            state: Arc::new(state),
            concurrency: concurrency.max(1),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        info!(concurrency = self.concurrency, "consumer started");

        loop {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| WorkerError::Processing(e.to_string()))?;
            let state = self.state.clone();

            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = process_next_job(&state).await {
                    tracing::error!(error = %e, "job failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            });
        }
    }
}

async fn conn(state: &WorkerState) -> Result<Connection> {
    state
        .redis_pool
        .get()
        .await
        .map_err(|e| WorkerError::Pool(e.to_string()))
}

async fn set_status(state: &WorkerState, job_id: Uuid, status: &JobResult) -> Result<()> {
    let json = serde_json::to_string(status)?;
    let mut c = conn(state).await?;
    c.set_ex::<_, _, ()>(keys::job_status(&job_id), &json, state.result_ttl_seconds)
        .await
        .map_err(|e| WorkerError::Redis(e.to_string()))
}

async fn process_next_job(state: &WorkerState) -> Result<()> {
    let popped: Option<(String, String)> = {
        let mut c = conn(state).await?;
        c.brpop(&queues::ALL, state.poll_timeout_seconds)
            .await
            .map_err(|e| WorkerError::Redis(e.to_string()))?
    };

    let Some((queue, payload)) = popped else {
        return Ok(());
    };

    match QueuedJob::parse(&queue, &payload)? {
        QueuedJob::Chat(job) => process_chat_job(state, job).await,
        QueuedJob::Ingest(job) => process_ingest_job(state, job).await,
    }
}

async fn process_chat_job(state: &WorkerState, job: ProcessChatJob) -> Result<()> {
    info!(job_id = %job.job_id, user_id = %job.user_id, "processing chat");
    set_status(state, job.job_id, &JobResult::processing(job.job_id)).await?;

    let outcome = async {
        let mut session = state
            .sessions
            .load(&job.user_id)
            .await?
            .unwrap_or_else(|| ChatSession::new(&job.user_id));
        let reply = state.chat.handle_turn(&mut session, &job.message).await?;
        state.sessions.save(&session).await?;
        Ok::<_, retirement_rag::domain::DomainError>(reply)
    }
    .await;

    let status = match outcome {
        Ok(reply) => JobResult::completed(
            job.job_id,
            serde_json::json!({
                "user_id": job.user_id,
                "reply": reply.reply,
                "intent": reply.intent,
                "used_context": reply.used_context,
                "profile_completed": reply.profile_completed,
            }),
        ),
        Err(e) => {
            tracing::error!(job_id = %job.job_id, error = %e, "chat failed");
            JobResult::failed(job.job_id, e.to_string())
        }
    };
    set_status(state, job.job_id, &status).await?;

    info!(job_id = %job.job_id, "chat completed");
    Ok(())
}

async fn process_ingest_job(state: &WorkerState, job: IngestDocumentJob) -> Result<()> {
    info!(job_id = %job.job_id, source = %job.source, "processing ingest");
    set_status(state, job.job_id, &JobResult::processing(job.job_id)).await?;

    let collection = match &job.collection {
        Some(name) => state.collection.renamed(name.clone()),
        None => state.collection.clone(),
    };
    info!(job_id = %job.job_id, collection = collection.name(), "ingest target");

    let status = match state
        .ingestion
        .ingest(&job.source, &collection, &state.splitter)
        .await
    {
        Ok(report) => JobResult::completed(job.job_id, serde_json::to_value(&report)?),
        Err(e) => {
            tracing::error!(job_id = %job.job_id, source = %job.source, error = %e, "ingest failed");
            JobResult::failed(job.job_id, e.to_string())
        }
    };
    set_status(state, job.job_id, &status).await?;

    info!(job_id = %job.job_id, "ingest completed");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worker=debug,retirement_rag=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let app = AppConfig::load()?;

    let redis_pool = create_pool(&app.config.storage.redis_url)?;
    info!("Redis pool initialized");

    let state = WorkerState::new(redis_pool, &app)?;
    info!(
        collection = state.collection.name(),
        docs = %app.config.storage.docs_path.display(),
        "pipeline ready"
    );

    let consumer = JobConsumer::new(state, app.config.worker.concurrency);
    consumer.start().await?;

    Ok(())
}
