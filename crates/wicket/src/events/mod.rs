//! Per-session real-time event feed.
//!
//! Proxied traffic and lifecycle changes are published here and delivered to
//! at most one live observer per session over SSE.

mod hub;
mod types;

pub use hub::{EventHub, Subscription};
pub use types::SessionEvent;
