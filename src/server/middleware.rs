//! # Server Middleware - HTTP Surface
//!
//! Wraps the [`ComparisonCore`] in an axum application:
//!
//! | Route | Method | Purpose |
//! |---|---|---|
//! | `/` | GET | Welcome message |
//! | `/health` | GET | Liveness check |
//! | `/compare-faces` | POST | Run one comparison |
//!
//! Every failure is turned into a JSON [`ErrorBody`](crate::common::messages::ErrorBody)
//! here; nothing escapes as an unhandled fault.

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Request, State},
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::common::config::{RelayConfig, ServerSettings};
use crate::common::error::RelayError;
use crate::common::messages::ComparisonRequest;
use crate::server::server::ComparisonCore;

pub const WELCOME_MESSAGE: &str = "Welcome to the face comparison relay API";
pub const NOT_JSON: &str = "Content-Type must be application/json";
pub const INVALID_JSON: &str = "Request body must be a valid JSON object";

/// Shared state handed to every handler.
pub struct AppState {
    core: ComparisonCore,
}

/// Build the application router.
pub fn router(core: ComparisonCore, settings: &ServerSettings) -> Router {
    let state = Arc::new(AppState { core });

    let mut app = Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/compare-faces", post(compare_faces))
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(from_fn(access_log));

    if settings.permissive_cors {
        app = app.layer(CorsLayer::permissive());
    }

    app.with_state(state)
}

/// The relay server: configuration plus the router built from it.
pub struct RelayServer {
    config: RelayConfig,
    app: Router,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let core = ComparisonCore::from_config(&config)?;
        let app = router(core, &config.server);
        Ok(Self { config, app })
    }

    /// Bind the configured address and serve until Ctrl-C / SIGTERM.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.config.server.bind).await?;

        info!("🌐 Face relay listening on http://{}", listener.local_addr()?);
        info!("📡 Verification endpoint: {}", self.config.verification.url);
        info!(
            "🛠️  Normalizer: {} {}",
            self.config.normalizer.program,
            self.config.normalizer.args.join(" ")
        );

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("👋 Face relay stopped");
        Ok(())
    }
}

async fn index() -> impl IntoResponse {
    Json(serde_json::json!({ "message": WELCOME_MESSAGE }))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "face-relay"
    }))
}

async fn compare_faces(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ComparisonRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            let err = reject_body(rejection);
            warn!("Rejected comparison request: {}", err);
            return err.into_response();
        }
    };

    match state.core.compare(request).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => {
            if err.status_code().is_server_error() {
                error!("❌ Comparison failed: {}", err);
            } else {
                warn!("Comparison rejected: {}", err);
            }
            err.into_response()
        }
    }
}

fn reject_body(rejection: JsonRejection) -> RelayError {
    let message = match &rejection {
        JsonRejection::MissingJsonContentType(_) => NOT_JSON,
        _ => INVALID_JSON,
    };
    RelayError::InvalidInput {
        message: message.to_string(),
        details: Some(rejection.body_text()),
    }
}

/// One access-log line per request.
async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} {} {}ms",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
