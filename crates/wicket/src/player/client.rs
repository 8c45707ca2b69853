//! HTTP client for the player API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

use super::PlayerApi;
use super::error::{PlayerError, PlayerResult};
use super::types::{AuthRequest, AuthResponse, LaunchUrlRequest, PlayerLaunch};

/// Client for the upstream player's REST API.
#[derive(Debug, Clone)]
pub struct HttpPlayer {
    /// HTTP client.
    client: Client,
    /// Base URL for the player (e.g., "http://localhost:63398").
    base_url: String,
    /// API key for the auth endpoint.
    api_key: String,
    /// API secret for the auth endpoint.
    api_secret: String,
    /// Audience requested for issued tokens.
    token_audience: String,
}

impl HttpPlayer {
    /// Create a new player client.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        token_audience: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            token_audience: token_audience.into(),
        }
    }

    /// Handle a response: parse JSON on success, surface status and message
    /// otherwise.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> PlayerResult<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| PlayerError::ParseError(format!("decoding response body: {}", e)))
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(PlayerError::UpstreamStatus {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl PlayerApi for HttpPlayer {
    async fn auth_token(&self, player_tenant_id: &str) -> PlayerResult<String> {
        let url = format!("{}/api/v1/auth", self.base_url);
        let request = AuthRequest {
            tenant_id: player_tenant_id.to_string(),
            audience: self.token_audience.clone(),
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .json(&request)
            .send()
            .await?;

        let auth: AuthResponse = self.handle_response(response).await?;
        Ok(auth.token)
    }

    async fn launch_url(
        &self,
        token: &str,
        player_course_id: &str,
        au_index: u32,
        registration_code: &str,
        actor: &Value,
    ) -> PlayerResult<PlayerLaunch> {
        let url = format!(
            "{}/api/v1/course/{}/launch-url/{}",
            self.base_url, player_course_id, au_index
        );
        let request = LaunchUrlRequest {
            reg: registration_code.to_string(),
            actor: actor.clone(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn delete_course(&self, token: &str, player_course_id: &str) -> PlayerResult<()> {
        let url = format!("{}/api/v1/course/{}", self.base_url, player_course_id);
        let response = self.client.delete(&url).bearer_auth(token).send().await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(PlayerError::UpstreamStatus {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HttpPlayer::new("http://localhost:63398", "key", "secret", "wicket");
        assert_eq!(client.base_url, "http://localhost:63398");
        assert_eq!(client.token_audience, "wicket");
    }

    #[test]
    fn test_upstream_status_message() {
        let err = PlayerError::UpstreamStatus {
            status: 404,
            message: "course not found".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("404"));
        assert!(text.contains("course not found"));
    }
}
