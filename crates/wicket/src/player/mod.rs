//! Upstream player client.
//!
//! The gateway talks to the player for three things: tenant-scoped auth
//! tokens, AU launch URLs, and course deletion. The surface is a trait so
//! integration tests can substitute a scripted implementation.

mod client;
mod error;
mod types;

pub use client::HttpPlayer;
pub use error::{PlayerError, PlayerResult};
pub use types::{AuthRequest, AuthResponse, LaunchUrlRequest, PlayerLaunch};

use async_trait::async_trait;
use serde_json::Value;

/// Operations the gateway needs from the upstream player service.
#[async_trait]
pub trait PlayerApi: Send + Sync {
    /// Request an auth token scoped to a player tenant.
    async fn auth_token(&self, player_tenant_id: &str) -> PlayerResult<String>;

    /// Request an AU launch URL for a course, passing the registration
    /// reference and actor identity.
    async fn launch_url(
        &self,
        token: &str,
        player_course_id: &str,
        au_index: u32,
        registration_code: &str,
        actor: &Value,
    ) -> PlayerResult<PlayerLaunch>;

    /// Delete a course upstream. Succeeds only on an upstream 204.
    async fn delete_course(&self, token: &str, player_course_id: &str) -> PlayerResult<()>;
}
