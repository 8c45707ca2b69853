//! Reverse proxy for per-session LRS traffic.
//!
//! Requests arriving under a session's rewritten endpoint are resolved
//! against stored session state and forwarded to the real upstream LRS.
//! Each proxied route implements [`ProxyPipeline`], a small strategy over
//! the request lifecycle: resolve the upstream target, run pre-dispatch
//! work, post-process the relayed response.

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{Method, Request, header},
    response::Response,
};
use log::{debug, error};

use crate::events::SessionEvent;

use super::error::ApiError;
use super::state::AppState;

/// Per-request routing context.
#[derive(Debug, Clone)]
pub struct ProxyContext {
    /// Session the request arrived under.
    pub session_id: i64,
    /// Request method.
    pub method: Method,
    /// Resource path below the proxy mount, without leading slash.
    pub resource: String,
    /// Raw query string, when present.
    pub query: Option<String>,
}

/// Strategy over the stages of one proxied request.
#[async_trait]
pub trait ProxyPipeline {
    /// Resolve the absolute upstream URI for this request.
    async fn resolve_upstream(
        &self,
        state: &AppState,
        ctx: &ProxyContext,
    ) -> Result<String, ApiError>;

    /// Runs after resolution and before the upstream dispatch is issued.
    async fn before_forward(&self, state: &AppState, ctx: &ProxyContext);

    /// Post-process the upstream response parts before relaying them.
    fn after_response(&self, parts: &mut axum::http::response::Parts);
}

/// Pipeline for `/sessions/{id}/lrs` traffic.
pub struct LrsRoute;

#[async_trait]
impl ProxyPipeline for LrsRoute {
    async fn resolve_upstream(
        &self,
        state: &AppState,
        ctx: &ProxyContext,
    ) -> Result<String, ApiError> {
        let session = state
            .sessions
            .get_session(ctx.session_id)
            .await
            .map_err(|e| {
                error!("Failed to load session {}: {:?}", ctx.session_id, e);
                ApiError::internal(format!("loading session {}", ctx.session_id))
            })?
            .ok_or_else(|| ApiError::not_found(format!("session {} not found", ctx.session_id)))?;

        // Endpoint and resource are joined as-is; the upstream LRS sees the
        // exact path shape the content requested.
        let mut target = format!("{}/{}", session.endpoint, ctx.resource);
        if let Some(query) = &ctx.query {
            target.push('?');
            target.push_str(query);
        }
        Ok(target)
    }

    async fn before_forward(&self, state: &AppState, ctx: &ProxyContext) {
        if ctx.method == Method::OPTIONS {
            return;
        }
        let method = ctx.method.as_str().to_lowercase();
        state
            .events
            .publish(ctx.session_id, SessionEvent::lrs(&method, &ctx.resource));
    }

    fn after_response(&self, parts: &mut axum::http::response::Parts) {
        parts.headers.remove(header::TRANSFER_ENCODING);
    }
}

/// Drive a request through a pipeline.
///
/// Resolves the target, publishes whatever the pipeline emits before
/// dispatch, forwards on the shared client, and relays the upstream
/// response with the body streamed through unchanged. Endpoints may be
/// http or https; TLS comes from the rustls-backed client.
pub async fn forward<P: ProxyPipeline>(
    pipeline: &P,
    state: &AppState,
    ctx: &ProxyContext,
    req: Request<Body>,
) -> Result<Response, ApiError> {
    let target = pipeline.resolve_upstream(state, ctx).await?;

    debug!("Proxying {} to {}", ctx.method, target);

    let url: reqwest::Url = target.parse().map_err(|e| {
        error!("Invalid target URL {}: {:?}", target, e);
        ApiError::internal(format!(
            "invalid upstream URL for session {}",
            ctx.session_id
        ))
    })?;

    pipeline.before_forward(state, ctx).await;

    let (parts, body) = req.into_parts();
    let mut upstream = reqwest::Request::new(parts.method, url);
    *upstream.headers_mut() = parts.headers;
    // Host follows the target authority; framing is renegotiated upstream.
    upstream.headers_mut().remove(header::HOST);
    upstream.headers_mut().remove(header::TRANSFER_ENCODING);
    *upstream.body_mut() = Some(reqwest::Body::wrap_stream(body.into_data_stream()));

    let response = state.http_client.execute(upstream).await.map_err(|e| {
        if e.is_connect() {
            error!("Upstream LRS unreachable: {:?}", e);
        } else {
            error!("Proxy request failed: {:?}", e);
        }
        ApiError::bad_gateway(format!("forwarding to upstream: {}", e))
    })?;

    let relayed: axum::http::Response<reqwest::Body> = response.into();
    let (mut parts, body) = relayed.into_parts();
    pipeline.after_response(&mut parts);
    Ok(Response::from_parts(parts, Body::new(body)))
}

/// Proxy LRS traffic for a session.
pub async fn proxy_lrs(
    State(state): State<AppState>,
    Path((session_id, resource)): Path<(i64, String)>,
    req: Request<Body>,
) -> Result<Response, ApiError> {
    let ctx = ProxyContext {
        session_id,
        method: req.method().clone(),
        resource,
        query: req.uri().query().map(str::to_string),
    };
    forward(&LrsRoute, &state, &ctx, req).await
}

/// Proxy LRS traffic addressed to the endpoint root.
pub async fn proxy_lrs_root(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    req: Request<Body>,
) -> Result<Response, ApiError> {
    let ctx = ProxyContext {
        session_id,
        method: req.method().clone(),
        resource: String::new(),
        query: req.uri().query().map(str::to_string),
    };
    forward(&LrsRoute, &state, &ctx, req).await
}
