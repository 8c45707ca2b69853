//! API request handlers.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use anyhow::Context as _;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::sse::{Event, KeepAlive, Sse},
    response::{AppendHeaders, IntoResponse, Response},
};
use axum_extra::extract::Host;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::events::{EventHub, SessionEvent};
use crate::session::{CreateSessionRequest, LaunchedSession, Session};

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Scheme and host the launched content will call back on, derived from the
/// incoming request. Deployments behind a TLS terminator set
/// `x-forwarded-proto`.
fn gateway_base(headers: &HeaderMap, host: &str) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{}://{}", scheme, host)
}

/// Create a new session.
#[instrument(skip(state, headers, request), fields(test_id = ?request.test_id, au_index = ?request.au_index))]
pub async fn create_session(
    State(state): State<AppState>,
    Host(host): Host,
    headers: HeaderMap,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<Json<LaunchedSession>> {
    let registration_id = request
        .test_id
        .ok_or_else(|| ApiError::bad_request("testId is required"))?;
    let au_index = request
        .au_index
        .ok_or_else(|| ApiError::bad_request("auIndex is required"))?;

    let base = gateway_base(&headers, &host);
    let launched = state
        .sessions
        .create_session(registration_id, au_index, &base)
        .await?;

    info!(session_id = launched.session.id, "Created session");
    Ok(Json(launched))
}

/// Get a specific session by ID.
#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> ApiResult<Json<Session>> {
    if let Some(session) = state.sessions.get_session(session_id).await? {
        return Ok(Json(session));
    }

    Err(ApiError::not_found(format!(
        "session {} not found",
        session_id
    )))
}

/// Delete a session.
///
/// Tears down the owning course on the player first; local rows cascade
/// only after the upstream confirms. The cascade takes every sibling
/// session of the course with it, so all their observer streams are ended,
/// not just the addressed one.
#[instrument(skip(state))]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let Some(torn_down) = state.sessions.delete_session(session_id).await? else {
        return Err(ApiError::not_found(format!(
            "session {} not found",
            session_id
        )));
    };

    for closed in torn_down {
        state.events.close(closed);
    }
    info!(session_id, "Deleted session");
    Ok(StatusCode::NO_CONTENT)
}

/// Stream of events for one observer, bound to the transport's lifetime.
///
/// Dropping the response body is the only close signal axum gives us, so
/// the teardown lives in `Drop`: the hub publishes the end control event
/// and removes the channel, unless a newer subscriber already took over.
struct ObserverStream {
    receiver: mpsc::Receiver<SessionEvent>,
    events: Arc<EventHub>,
    session_id: i64,
    token: u64,
}

impl tokio_stream::Stream for ObserverStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.receiver.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                let data = event.data.to_string();
                let frame = match event.name {
                    Some(name) => Event::default().event(name).data(data),
                    None => Event::default().data(data),
                };
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ObserverStream {
    fn drop(&mut self) {
        self.events.disconnect(self.session_id, self.token);
    }
}

/// SSE stream of proxied traffic for a session.
#[instrument(skip(state))]
pub async fn session_events(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    if state.sessions.get_session(session_id).await?.is_none() {
        return Err(ApiError::not_found(format!(
            "session {} not found",
            session_id
        )));
    }

    let subscription = state.events.subscribe(session_id);
    let stream = ObserverStream {
        receiver: subscription.receiver,
        events: state.events.clone(),
        session_id,
        token: subscription.token,
    };

    Ok((
        AppendHeaders([
            (header::CONTENT_ENCODING, "identity"),
            (header::CONNECTION, "keep-alive"),
        ]),
        Sse::new(stream).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keepalive"),
        ),
    ))
}

/// Fixed-shape soft-failure envelope for the fetch relay.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchErrorEnvelope {
    error_code: String,
    error_text: String,
}

/// Issue the upstream token fetch for a session.
async fn upstream_fetch(state: &AppState, session_id: i64) -> anyhow::Result<(StatusCode, Value)> {
    let session = state
        .sessions
        .get_session(session_id)
        .await?
        .with_context(|| format!("session {} not found", session_id))?;

    let client = reqwest::Client::new();
    let response = client
        .post(&session.fetch_url)
        .send()
        .await
        .context("posting to upstream fetch URL")?;

    let status = response.status();
    let body: Value = response.json().await.context("decoding fetch response")?;
    Ok((status, body))
}

/// Relay the content's token fetch to the upstream fetch URL.
///
/// This path never hard-fails: whatever goes wrong (unknown session,
/// transport failure, non-JSON body) the caller gets the fixed cmi5 error
/// envelope with status 400, so a broken token refresh cannot take down a
/// running AU. The outcome is published to observers either way.
#[instrument(skip(state))]
pub async fn fetch_token(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> Response {
    match upstream_fetch(&state, session_id).await {
        Ok((status, body)) => {
            state
                .events
                .publish(session_id, SessionEvent::fetch_status(status.as_u16()));
            (status, Json(body)).into_response()
        }
        Err(e) => {
            let cause = format!("{:#}", e);
            warn!(session_id, error = %cause, "Fetch relay failed");
            state
                .events
                .publish(session_id, SessionEvent::fetch_error(&cause));

            let envelope = FetchErrorEnvelope {
                error_code: "3".to_string(),
                error_text: format!("General Application Error: {}", cause),
            };
            (StatusCode::BAD_REQUEST, Json(envelope)).into_response()
        }
    }
}
