use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, ConnectInfo, State},
    response::{IntoResponse, Response},
    Json,
};
use http::{HeaderMap, Method, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{
    auth::{presented_token, Authorization},
    body,
    error::ApiError,
    opener::open_url,
    AppState, VERSION,
};

// ── Ping ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub ok: bool,
    pub version: &'static str,
    pub client_ip: String,
    pub allowed: bool,
    pub token_ok: bool,
}

/// Diagnostic probe: reports what `/open` would decide, always 200.
pub async fn ping(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Json<PingResponse> {
    let client = peer.ip().to_canonical();
    let auth = Authorization::evaluate(&state.config, client, presented_token(&headers));
    Json(PingResponse {
        ok: auth.permitted(),
        version: VERSION,
        client_ip: client.to_string(),
        allowed: auth.allowed,
        token_ok: auth.token_ok,
    })
}

// ── Open ──────────────────────────────────────────────────────────────────────

/// Runs behind [`crate::auth::require_authorized`].
pub async fn open(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    raw: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let client = peer.ip().to_canonical();
    let req = body::decode(&raw?);
    let url = req.url().ok_or(ApiError::MissingUrl)?;

    match open_url(&state.config, state.launcher.as_ref(), url).await {
        Ok(message) => {
            info!(%client, url, "opened");
            Ok(Json(json!({"ok": true, "message": message})).into_response())
        }
        Err(e) => {
            info!(%client, url, error = %e, "open failed");
            Err(e.into())
        }
    }
}

// ── Preflight / fallback ──────────────────────────────────────────────────────

/// CORS preflight on any path. Headers come from the router layers.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Router-wide fallback: preflight for OPTIONS on unknown paths, 404 otherwise.
pub async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        preflight().await.into_response()
    } else {
        ApiError::NotFound.into_response()
    }
}
