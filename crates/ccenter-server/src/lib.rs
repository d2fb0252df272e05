pub mod error;
pub mod routes;
pub mod sources;
pub mod state;

use axum::routing::{delete, get, post, put};
use axum::Router;
use ccenter_core::config::Config;
use ccenter_core::skill::SkillCatalog;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{AppState, SseMessage};

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Running executions
        .route("/api/running", get(routes::running::list_running))
        .route(
            "/api/running/clear-stale",
            post(routes::running::clear_stale),
        )
        .route(
            "/api/running/{id}",
            delete(routes::running::clear_execution),
        )
        .route("/api/running/{id}/steps", get(routes::running::get_steps))
        // Watch
        .route("/api/watch", delete(routes::watch::clear_watch))
        .route("/api/watch/{id}", put(routes::watch::select_watch))
        // View
        .route(
            "/api/view",
            get(routes::view::get_view).put(routes::view::set_view),
        )
        .route("/api/jobs/{name}/open", post(routes::jobs::open_job))
        // Skills
        .route("/api/skills", get(routes::skills::list_skills))
        // Config
        .route("/api/config", get(routes::config::get_config))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Load the skill catalog, start the source adapters and build the state.
pub fn start(root: PathBuf, config: Config) -> anyhow::Result<AppState> {
    let catalog = SkillCatalog::load_dir(&config.skills_path(&root))?;
    tracing::info!(skills = catalog.len(), "skill catalog loaded");
    let app_state = AppState::new(root, config, catalog);
    sources::spawn_all(&app_state)?;
    Ok(app_state)
}

/// Start the Command Center server.
pub async fn serve(root: PathBuf, config: Config, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(root, config, listener).await
}

/// Start the server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(
    root: PathBuf,
    config: Config,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(start(root, config)?);

    tracing::info!("Command Center listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
