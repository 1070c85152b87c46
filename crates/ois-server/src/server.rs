use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use http::{
    header::{
        ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        SERVER,
    },
    HeaderValue,
};
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    auth::require_authorized,
    handlers,
    opener::{Launcher, SystemLauncher},
    AppState, ServerConfig, VERSION,
};

/// Serve with the real `open` launcher until Ctrl-C / SIGTERM.
pub async fn run(cfg: ServerConfig) -> Result<()> {
    let launcher = Arc::new(SystemLauncher::for_browser(&cfg));
    run_with_launcher(cfg, launcher).await
}

pub async fn run_with_launcher(cfg: ServerConfig, launcher: Arc<dyn Launcher>) -> Result<()> {
    let listener = TcpListener::bind((cfg.bind.as_str(), cfg.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", cfg.bind, cfg.port))?;

    info!(version = VERSION, "open in safari server");
    info!(addr = %listener.local_addr()?, "listening");
    info!(subnets = %cfg.subnets_display(), "allowed subnets");
    info!(token = %cfg.redacted_token(), "shared token");
    if cfg.dry_run {
        info!("dry run enabled: URLs are logged, never opened");
    }
    info!("endpoints: POST /open, GET /ping");

    serve(listener, AppState::new(cfg, launcher)).await
}

/// Serve on an already bound listener, exposing peer addresses to handlers.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let app = router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")
}

pub fn router(state: AppState) -> Router {
    let ping = get(handlers::ping)
        .options(handlers::preflight)
        .fallback(handlers::not_found);

    // Only the POST is guarded; preflight must pass without credentials.
    let open = post(handlers::open)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_authorized,
        ))
        .options(handlers::preflight)
        .fallback(handlers::not_found);

    Router::new()
        .route("/ping", ping)
        .route("/open", open)
        .fallback(handlers::fallback)
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, X-OpenInSafari-Token"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            SERVER,
            server_header(),
        ))
        .layer(TraceLayer::new_for_http())
}

fn server_header() -> HeaderValue {
    HeaderValue::from_str(&format!("OpenInSafariServer/{VERSION}"))
        .unwrap_or_else(|_| HeaderValue::from_static("OpenInSafariServer"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}
