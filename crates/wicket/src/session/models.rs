//! Session data models.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use sqlx::types::Json;

/// A launched AU session.
///
/// The `player_*`, `launch_url`, `endpoint`, and `fetch_url` columns hold
/// upstream references that must never reach a client; they are skipped
/// during serialization.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session ID.
    pub id: i64,
    /// Tenant that owns this session.
    pub tenant_id: i64,
    /// Registration this session was launched under.
    pub registration_id: i64,
    /// Session ID assigned by the upstream player.
    #[serde(skip_serializing)]
    pub player_session_id: String,
    /// Original launch URL issued by the player, unrewritten.
    #[serde(skip_serializing)]
    pub launch_url: String,
    /// Upstream LRS endpoint parsed from the launch URL.
    #[serde(skip_serializing)]
    pub endpoint: String,
    /// Upstream fetch URL parsed from the launch URL.
    #[serde(skip_serializing)]
    pub fetch_url: String,
    /// Arbitrary session metadata.
    pub metadata: Json<Value>,
    /// When the session was created.
    pub created_at: String,
}

/// Column values for inserting a session row.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Tenant that owns the session.
    pub tenant_id: i64,
    /// Registration the session was launched under.
    pub registration_id: i64,
    /// Session ID assigned by the upstream player.
    pub player_session_id: String,
    /// Original launch URL issued by the player.
    pub launch_url: String,
    /// Upstream LRS endpoint.
    pub endpoint: String,
    /// Upstream fetch URL.
    pub fetch_url: String,
}

/// Request to create a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Registration to launch (the harness calls this the test ID).
    #[serde(default)]
    pub test_id: Option<i64>,
    /// Zero-based AU index within the course structure.
    #[serde(default)]
    pub au_index: Option<u32>,
}

/// Response from session creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchedSession {
    /// The stored session row.
    #[serde(flatten)]
    pub session: Session,
    /// Launch URL with endpoint and fetch rewritten to gateway routes.
    pub launch_url: String,
}
