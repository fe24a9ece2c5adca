//! Token counting HTTP server.
//!
//! Provides an HTTP API over the token counter:
//! - `POST /tokenizer/:model` - count tokens for one message or a list
//! - `GET /models` - supported snapshots, aliases and families
//! - `GET /health`, `GET /status`
//!
//! The tokenizer endpoint answers with a `{code, num_tokens}` envelope on
//! success and `{code: 500, msg}` on failure.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokcount::server::{create_router, serve, AppState, ServerConfig};
//! use tokcount::{Config, TokenCounter};
//!
//! let counter = TokenCounter::from_config(&Config::from_env())?;
//! let state = Arc::new(AppState::new(ServerConfig::default(), counter));
//! serve(state).await?;
//! ```

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use tokio::net::TcpListener;

pub use config::ServerConfig;
pub use handlers::{create_router, health_check, TokenizerRequest, TokenizerResponse};
pub use state::AppState;

use crate::error::{Result, TokCountError};

/// Bind the configured address and serve until the process stops.
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr = state.config.addr;
    let router = create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| TokCountError::Server(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| TokCountError::Server(format!("Server error: {}", e)))
}
