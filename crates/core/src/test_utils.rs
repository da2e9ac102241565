//! Shared helper for constructing a minimal `AppState` against an in-memory
//! SQLite pool, used by the handler/middleware unit tests.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::config_store::ConfigStore;
use crate::events::EventLog;
use crate::llm::Gateway;
use crate::pipeline::Orchestrator;
use crate::scoring::ScoringEngine;

pub async fn create_test_app_state(admin_api_key: Option<String>) -> Arc<crate::AppState> {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    crate::db::init_db(&pool).await.unwrap();

    let mut config = AppConfig::load().unwrap();
    config.admin_api_key = admin_api_key;

    let config_dir = std::env::temp_dir().join(format!("mastery-test-config-{}", uuid::Uuid::new_v4()));
    let config_store = Arc::new(ConfigStore::load(config_dir).await.unwrap());

    let event_log_dir = std::env::temp_dir().join(format!("mastery-test-events-{}", uuid::Uuid::new_v4()));
    let event_log = Arc::new(EventLog::new(event_log_dir).unwrap());

    let gateway = Arc::new(Gateway::new(None, None, None));
    let scoring_engine = Arc::new(ScoringEngine::new(pool.clone()));
    let orchestrator = Arc::new(Orchestrator::new(
        pool.clone(),
        config_store.clone(),
        gateway.clone(),
        scoring_engine.clone(),
        event_log.clone(),
    ));

    let rate_limiter = Arc::new(crate::middleware::RateLimiter::new(10, 20));

    Arc::new(crate::AppState {
        pool,
        config_store,
        gateway,
        scoring_engine,
        event_log,
        orchestrator,
        config,
        rate_limiter,
    })
}
