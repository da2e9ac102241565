pub mod config;
pub mod config_store;
pub mod db;
pub mod events;
pub mod handlers;
pub mod llm;
pub mod middleware;
pub mod pipeline;
pub mod prompts;
pub mod scoring;
pub mod test_utils;
pub mod validation;

use std::sync::Arc;

use mastery_shared::EngineError;
use sqlx::SqlitePool;

use config::AppConfig;
use config_store::ConfigStore;
use events::EventLog;
use llm::Gateway;
use pipeline::Orchestrator;
use scoring::ScoringEngine;

/// Shared state handed to every axum handler: the DB pool, the four
/// subsystems the Pipeline Orchestrator drives, and the process-wide
/// env-derived configuration.
pub struct AppState {
    pub pool: SqlitePool,
    pub config_store: Arc<ConfigStore>,
    pub gateway: Arc<Gateway>,
    pub scoring_engine: Arc<ScoringEngine>,
    pub event_log: Arc<EventLog>,
    pub orchestrator: Arc<Orchestrator>,
    pub config: AppConfig,
    pub rate_limiter: Arc<middleware::RateLimiter>,
}

/// Thin axum-facing wrapper around `EngineError` (§7): maps the domain error
/// taxonomy (plus `sqlx`/`anyhow` failures that never reach `EngineError`) to
/// an HTTP status and a uniform `{"status":"error","error":{...}}` body.
pub enum AppError {
    Engine(EngineError),
    Internal(anyhow::Error),
    NotFound(String),
    Unauthorized,
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, err_type, message) = match self {
            AppError::Engine(e) => {
                let status = match &e {
                    EngineError::SubmissionValidationError(_) => axum::http::StatusCode::BAD_REQUEST,
                    EngineError::ActivitySchemaError { .. } => axum::http::StatusCode::UNPROCESSABLE_ENTITY,
                    EngineError::LLMProviderError { .. } | EngineError::LLMAggregateError(_) => {
                        axum::http::StatusCode::BAD_GATEWAY
                    }
                    EngineError::ConfigurationError(_)
                    | EngineError::ParseError(_)
                    | EngineError::StorageError(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, error_type_name(&e), e.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalError".to_string(),
                    "an internal error occurred".to_string(),
                )
            }
            AppError::NotFound(m) => (axum::http::StatusCode::NOT_FOUND, "NotFound".to_string(), m),
            AppError::Unauthorized => (
                axum::http::StatusCode::FORBIDDEN,
                "Unauthorized".to_string(),
                "missing or invalid admin API key".to_string(),
            ),
        };

        let body = axum::Json(serde_json::json!({
            "status": "error",
            "error": { "type": err_type, "message": message }
        }));

        (status, body).into_response()
    }
}

fn error_type_name(e: &EngineError) -> String {
    match e {
        EngineError::ConfigurationError(_) => "ConfigurationError",
        EngineError::ActivitySchemaError { .. } => "ActivitySchemaError",
        EngineError::SubmissionValidationError(_) => "SubmissionValidationError",
        EngineError::LLMProviderError { .. } => "LLMProviderError",
        EngineError::LLMAggregateError(_) => "LLMAggregateError",
        EngineError::ParseError(_) => "ParseError",
        EngineError::StorageError(_) => "StorageError",
    }
    .to_string()
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::Engine(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(anyhow::anyhow!(err))
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Boots the Mastery Engine HTTP service: loads config, connects the
/// database, wires the four core subsystems into an `Orchestrator`, and
/// serves the HTTP surface (§6).
#[allow(clippy::too_many_lines)]
pub async fn run_server() -> anyhow::Result<()> {
    use axum::{
        routing::{get, put},
        Router,
    };
    use tower_http::cors::CorsLayer;
    use tracing::info;

    info!("+---------------------------------------+");
    info!("|           Mastery Engine Service       |");
    info!("|            Version {:<10}      |", env!("CARGO_PKG_VERSION"));
    info!("+---------------------------------------+");

    let config = AppConfig::load()?;

    if let Some(path_str) = config.database_url.strip_prefix("sqlite:") {
        let db_path = std::path::Path::new(path_str);
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && parent != std::path::Path::new(".") {
                std::fs::create_dir_all(parent)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let _ = std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700));
                }
            }
        }
    }

    let pool = db::connect(&config.database_url).await?;
    db::init_db(&pool).await?;

    let config_store = Arc::new(ConfigStore::load(config.config_dir.clone()).await?);
    let gateway = Arc::new(Gateway::new(
        config.provider_a_key.clone(),
        config.provider_o_key.clone(),
        config.provider_g_key.clone(),
    ));
    let scoring_engine = Arc::new(ScoringEngine::new(pool.clone()));
    let event_log = Arc::new(EventLog::new(config.event_log_dir.clone())?);
    let orchestrator = Arc::new(Orchestrator::new(
        pool.clone(),
        config_store.clone(),
        gateway.clone(),
        scoring_engine.clone(),
        event_log.clone(),
    ));
    let rate_limiter = Arc::new(middleware::RateLimiter::new(10, 20));

    let app_state = Arc::new(AppState {
        pool,
        config_store,
        gateway,
        scoring_engine,
        event_log,
        orchestrator,
        config: config.clone(),
        rate_limiter: rate_limiter.clone(),
    });

    let rl = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            rl.cleanup();
        }
    });

    let admin_routes = Router::new()
        .route("/learners/:id/reset", axum::routing::post(handlers::admin::reset_handler))
        .route("/recalculate", axum::routing::post(handlers::admin::recalculate_handler))
        .route("/config/:doc", put(handlers::config_doc::put_doc))
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit_middleware,
        ));

    let api_routes = Router::new()
        .route("/evaluate", axum::routing::post(handlers::evaluate::evaluate_handler))
        .route("/learners/:id/skills", get(handlers::learners::skill_progress_handler))
        .route("/learners/:id/history", get(handlers::learners::history_handler))
        .route("/config/:doc", get(handlers::config_doc::get_doc))
        .route("/events", get(handlers::events::sse_handler))
        .route("/events/history", get(handlers::events::history_handler))
        .route("/system/health", get(handlers::health_handler))
        .route("/system/version", get(handlers::version_handler))
        .nest("/admin", admin_routes)
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024));

    let app = Router::new()
        .nest("/api", api_routes)
        .with_state(app_state.clone())
        .layer(CorsLayer::new().allow_origin(config.cors_origins.clone()).allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
        ]).allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderName::from_static("x-api-key"),
        ]));

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.bind_address, config.port)).await?;
    info!("listening on http://{}:{}", config.bind_address, config.port);

    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>()).await?;
    Ok(())
}
