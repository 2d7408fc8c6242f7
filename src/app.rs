use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers::{elevated, protected, public};
use crate::mail::{self, Mailer};
use crate::middleware::{admin_verified_middleware, current_user_middleware, jwt_auth_middleware};
use crate::services::{leagues, trace::trace_error, ServiceFailure};
use crate::store::{self, Store};

/// Shared handles for every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            mailer,
        }
    }

    pub fn presence_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.config.presence.session_timeout_secs)
    }

    /// Awaits a service call, tracing internal failures into `error_logs`.
    pub async fn traced<T, E, F>(&self, operation: &str, call: F) -> Result<T, ApiError>
    where
        E: ServiceFailure,
        F: Future<Output = Result<T, E>>,
    {
        match call.await {
            Ok(value) => Ok(value),
            Err(err) => match err.client_error() {
                Some(api_error) => Err(api_error),
                None => Err(trace_error(self.store.as_ref(), &err, json!({ "operation": operation })).await),
            },
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(elevated_routes(state.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/api/pub-chat", get(public::pub_chat_get))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/users/me", get(protected::me_get).put(protected::me_put))
        .route("/api/predictions", post(protected::prediction_post))
        .route("/api/predictions/:race_id", get(protected::predictions_get))
        .route("/api/scores/:race_id", get(protected::scores_get))
        .route("/api/standings", get(protected::standings_get))
        .route("/api/leagues", get(protected::leagues_get).post(protected::league_post))
        .route("/api/leagues/:id/join", post(protected::league_join))
        .route("/api/leagues/:id/leave", post(protected::league_leave))
        .route("/api/presence/heartbeat", post(protected::heartbeat_post))
        .route("/api/presence/:session_id", delete(protected::session_delete))
        .route("/api/admin/challenge", post(protected::challenge_post))
        .route("/api/admin/verify", post(protected::verify_post))
        // Layers run bottom-up: JWT first, then the user lookup
        .route_layer(from_fn_with_state(state.clone(), current_user_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

/// Served under `/admin` so the `adminVerified` cookie (Path=/admin) reaches them.
fn elevated_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/results", post(elevated::result_post))
        .route("/admin/scores/:race_id/recalculate", post(elevated::recalculate_post))
        .route("/admin/audit-logs", get(elevated::audit_logs_get))
        .route("/admin/error-logs", get(elevated::error_logs_get))
        .route("/admin/pub-chat", put(elevated::pub_chat_put))
        .route_layer(from_fn(admin_verified_middleware))
        .route_layer(from_fn_with_state(state.clone(), current_user_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

/// Opens the store and mailer from `config`, then serves until shutdown.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    config.validate()?;

    let store = store::open(&config).await?;
    leagues::ensure_global_league(store.as_ref(), chrono::Utc::now()).await?;
    let mailer = mail::from_config(&config)?;

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    tracing::info!(
        "Starting Prix Six in {:?} mode with the {:?} store",
        config.environment,
        config.database.backend
    );

    let app = router(AppState::new(config, store, mailer));
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Prix Six API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
