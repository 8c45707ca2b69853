//! API route definitions.

use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::handlers;
use super::proxy;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state);

    // Tracing layer with request IDs and timing
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Harness-facing routes
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/{session_id}", get(handlers::get_session))
        .route("/sessions/{session_id}", delete(handlers::delete_session))
        .route(
            "/sessions/{session_id}/events",
            get(handlers::session_events),
        )
        .route("/sessions/{session_id}/fetch", post(handlers::fetch_token))
        .layer(cors)
        .with_state(state.clone());

    // Proxied LRS traffic relays the upstream's own CORS headers, so these
    // routes take no cors layer.
    let lrs_routes = Router::new()
        .route(
            "/sessions/{session_id}/lrs",
            get(proxy::proxy_lrs_root)
                .post(proxy::proxy_lrs_root)
                .put(proxy::proxy_lrs_root)
                .delete(proxy::proxy_lrs_root)
                .options(proxy::proxy_lrs_root),
        )
        .route(
            "/sessions/{session_id}/lrs/{*resource}",
            get(proxy::proxy_lrs)
                .post(proxy::proxy_lrs)
                .put(proxy::proxy_lrs)
                .delete(proxy::proxy_lrs)
                .options(proxy::proxy_lrs),
        )
        .with_state(state);

    Router::new()
        .merge(api_routes)
        .merge(lrs_routes)
        .layer(trace_layer)
}

/// Build the CORS layer for the harness-facing routes.
///
/// With no configured origins, any origin is allowed without credentials.
/// Configured origins get exact matching with credentials.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let headers = [
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::ORIGIN,
        header::HeaderName::from_static("x-experience-api-version"),
    ];

    if state.cors_origins.is_empty() {
        tracing::warn!("CORS: No origins configured, allowing any origin");
        return CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(methods)
            .allow_headers(headers);
    }

    let origins: Vec<HeaderValue> = state
        .cors_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if origins.is_empty() {
        tracing::error!("CORS: All configured origins are invalid!");
        CorsLayer::new().allow_origin(AllowOrigin::exact(HeaderValue::from_static("null")))
    } else {
        tracing::info!("CORS: Allowing {} origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true)
    }
}
