//! Server state.

use std::time::{Duration, Instant};

use super::config::ServerConfig;
use crate::tokenizer::TokenCounter;

/// Application state shared across handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Token counter (owns the shared encoding cache)
    pub counter: TokenCounter,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ServerConfig, counter: TokenCounter) -> Self {
        Self {
            config,
            counter,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
