//! HTTP surface for the Note Service.
//!
//! Note routes live under `/api` and sit behind bearer-token auth; `/health`
//! is public.

pub mod auth;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, patch};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::{MurmurError, Result};
use crate::service::NoteService;
use crate::storage::{ImageStore, NoteStore};

pub use auth::{AuthUser, JwtService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: NoteService,
    pub jwt: Arc<JwtService>,
}

impl AppState {
    /// Open the stores under the configured data directory
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = NoteStore::open(&config.data_dir)?;
        let images = ImageStore::new(config.uploads_dir(), config.upload_url_prefix.clone());
        let jwt = JwtService::new(config.require_secret()?, config.jwt_issuer.clone());

        Ok(Self {
            service: NoteService::new(store, images),
            jwt: Arc::new(jwt),
        })
    }
}

/// Build the Axum application router
pub fn build_router(state: AppState, config: &Config) -> Result<Router> {
    let notes = Router::new()
        .route("/notes", get(routes::list_notes).post(routes::create_note))
        .route(
            "/notes/{id}",
            get(routes::get_note)
                .put(routes::update_note)
                .delete(routes::delete_note),
        )
        .route("/notes/{id}/favorite", patch(routes::toggle_favorite))
        .route(
            "/notes/{id}/image",
            patch(routes::upload_image)
                .put(routes::upload_image)
                .layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        .route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            auth::require_auth,
        ));

    let router = Router::new()
        .route("/health", get(routes::health))
        .nest("/api", notes)
        .layer(cors_layer(&config.allowed_origins)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins = allowed_origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o)
                    .map_err(|_| MurmurError::Config(format!("Invalid allowed origin: {}", o)))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]))
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: Config) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = build_router(state, &config)?;

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(
        addr = %config.bind,
        data_dir = %config.data_dir.display(),
        "Serving notes API"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
