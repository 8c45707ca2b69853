//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::events::EventHub;
use crate::session::SessionService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session service for brokering launches and teardowns.
    pub sessions: Arc<SessionService>,
    /// Event hub for per-session observer streams.
    pub events: Arc<EventHub>,
    /// HTTP client for proxying requests to the upstream LRS.
    pub http_client: Client,
    /// Origins allowed on the harness-facing routes.
    pub cors_origins: Vec<String>,
}

impl AppState {
    /// Create new application state.
    pub fn new(sessions: SessionService) -> Self {
        // No redirect following and no overall timeout; upstream 3xx and
        // long-lived response streams relay to the caller as-is.
        let http_client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            sessions: Arc::new(sessions),
            events: Arc::new(EventHub::new()),
            http_client,
            cors_origins: Vec::new(),
        }
    }

    /// Set the allowed CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }
}
