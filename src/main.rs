use retirement_rag::api::{create_router, queue, AppState};
use retirement_rag::infrastructure::{bootstrap, AppConfig};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=debug,retirement_rag=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    let redis_pool = queue::create_pool(&config.config.storage.redis_url)?;
    info!("Redis pool initialized");

    // An in-memory index here would never see the worker's ingestions.
    let collection = match config.config.storage.qdrant_url {
        Some(_) => Some(bootstrap::collection(&config.config)?),
        None => None,
    };
    let addr: SocketAddr = config.config.server_addr().parse()?;

    let mut state = AppState::new(redis_pool, config);
    if let Some(collection) = collection {
        state = state.with_collection(collection);
    }
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
