pub mod auth;
pub mod body;
pub mod config;
pub mod error;
pub mod handlers;
pub mod opener;
pub mod server;

use std::sync::Arc;

/// Version reported by `GET /ping` and the `Server` header.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state threaded through axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Read-only configuration, loaded once at startup.
    pub config: Arc<ServerConfig>,
    /// OS primitive that actually opens the URL.
    pub launcher: Arc<dyn opener::Launcher>,
}

impl AppState {
    pub fn new(config: ServerConfig, launcher: Arc<dyn opener::Launcher>) -> Self {
        Self {
            config: Arc::new(config),
            launcher,
        }
    }
}

pub use auth::{Authorization, TOKEN_HEADER};
pub use config::ServerConfig;
pub use error::{ApiError, OpenError};
pub use server::{router, run, run_with_launcher};
