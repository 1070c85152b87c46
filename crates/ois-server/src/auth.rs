use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use constant_time_eq::constant_time_eq;
use http::HeaderMap;
use ipnet::IpNet;
use tracing::info;

use crate::{error::ApiError, AppState, ServerConfig};

/// Header carrying the shared secret.
pub const TOKEN_HEADER: &str = "x-openinsafari-token";

/// Outcome of the two independent checks made for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorization {
    pub allowed: bool,
    pub token_ok: bool,
}

impl Authorization {
    pub fn evaluate(cfg: &ServerConfig, client: IpAddr, token: &str) -> Self {
        Self {
            allowed: origin_allowed(client, &cfg.allowed_subnets),
            token_ok: token_ok(&cfg.token, token),
        }
    }

    pub fn permitted(&self) -> bool {
        self.allowed && self.token_ok
    }

    /// Origin is checked first; a denied origin never reaches the token check.
    pub fn check(&self) -> Result<(), ApiError> {
        if !self.allowed {
            return Err(ApiError::Forbidden);
        }
        if !self.token_ok {
            return Err(ApiError::Unauthorized);
        }
        Ok(())
    }
}

/// True when `client` falls inside any of `subnets`.
pub fn origin_allowed(client: IpAddr, subnets: &[IpNet]) -> bool {
    let client = client.to_canonical();
    subnets.iter().any(|net| net.contains(&client))
}

/// Same as [`origin_allowed`] for an address still in text form; anything
/// unparsable is denied.
pub fn origin_allowed_str(client: &str, subnets: &[IpNet]) -> bool {
    client
        .parse::<IpAddr>()
        .map(|ip| origin_allowed(ip, subnets))
        .unwrap_or(false)
}

/// An empty configured secret disables the check.
pub fn token_ok(expected: &str, presented: &str) -> bool {
    expected.is_empty() || constant_time_eq(presented.as_bytes(), expected.as_bytes())
}

/// Token as sent by the caller; missing or non-UTF-8 headers read as empty.
pub fn presented_token(headers: &HeaderMap) -> &str {
    headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Axum middleware guarding the action endpoint: peer address, then token.
pub async fn require_authorized(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let client = peer.ip().to_canonical();
    let auth = Authorization::evaluate(&state.config, client, presented_token(request.headers()));

    match auth.check() {
        Ok(()) => next.run(request).await,
        Err(e) => {
            if !auth.allowed {
                info!(
                    %client,
                    allowed = %state.config.subnets_display(),
                    "deny: client not in allowed subnets"
                );
            } else {
                info!(%client, "deny: token mismatch [redacted]");
            }
            e.into_response()
        }
    }
}
