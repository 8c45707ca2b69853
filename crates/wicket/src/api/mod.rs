//! HTTP API module.
//!
//! Provides the harness-facing REST surface, the session event stream, and
//! the per-session LRS reverse proxy.

mod error;
mod handlers;
mod proxy;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
