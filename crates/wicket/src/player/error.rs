//! Player client error types.

use thiserror::Error;

/// Result type for player operations.
pub type PlayerResult<T> = Result<T, PlayerError>;

/// Errors that can occur while talking to the player.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Transport-level failure reaching the player.
    #[error("player request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The player answered with a non-success status.
    #[error("player returned {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    /// Failed to parse a player response body.
    #[error("failed to parse player response: {0}")]
    ParseError(String),
}
