use std::sync::Arc;

use crate::api::queue::{JobProducer, RedisPool};
use crate::application::Collection;
use crate::infrastructure::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub redis_pool: RedisPool,
    pub job_producer: JobProducer,
    /// Enables direct search; ingestion and chat always go through the worker.
    pub collection: Option<Collection>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(redis_pool: RedisPool, config: AppConfig) -> Self {
        let config = Arc::new(config);
        let job_producer =
            JobProducer::new(redis_pool.clone(), config.config.worker.result_ttl_seconds);
        Self {
            redis_pool,
            job_producer,
            collection: None,
            config,
        }
    }

    pub fn with_collection(mut self, collection: Collection) -> Self {
        self.collection = Some(collection);
        self
    }
}
