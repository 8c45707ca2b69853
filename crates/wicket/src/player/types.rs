//! Player API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body for `POST /api/v1/auth`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    /// Player tenant the token is scoped to.
    pub tenant_id: String,
    /// Audience the token is issued for.
    pub audience: String,
}

/// Response from `POST /api/v1/auth`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent calls.
    pub token: String,
}

/// Body for the launch-url request.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchUrlRequest {
    /// Upstream registration reference.
    pub reg: String,
    /// xAPI actor identity.
    pub actor: Value,
}

/// An issued AU launch: the player's own session id plus the launch URL
/// carrying `endpoint` and `fetch` query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerLaunch {
    /// Player-assigned session id.
    pub id: String,
    /// Launch URL as issued by the player.
    pub url: String,
}
