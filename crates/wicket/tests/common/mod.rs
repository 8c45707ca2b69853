//! Test utilities and common setup.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, BodyDataStream};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use wicket::api::{self, AppState};
use wicket::catalog::{CourseRepository, RegistrationRepository, TenantRepository};
use wicket::db::Database;
use wicket::player::{PlayerApi, PlayerError, PlayerLaunch, PlayerResult};
use wicket::session::{SessionRepository, SessionService};

/// Scripted player standing in for the upstream service.
///
/// Records the calls it receives so tests can assert what the gateway sent
/// upstream, and fails on demand to exercise the error paths.
pub struct MockPlayer {
    /// Launch URL handed out for every launch request.
    pub launch_url: String,
    /// Launch calls seen, as (player course ID, AU index, registration code).
    pub launches: Mutex<Vec<(String, u32, String)>>,
    /// Player course IDs the gateway asked to delete.
    pub deletions: Mutex<Vec<String>>,
    /// Fail auth token requests with an upstream 500.
    pub fail_auth: bool,
    /// Fail course deletion with an upstream 500.
    pub fail_delete: bool,
}

impl MockPlayer {
    pub fn new(launch_url: impl Into<String>) -> Self {
        Self {
            launch_url: launch_url.into(),
            launches: Mutex::new(Vec::new()),
            deletions: Mutex::new(Vec::new()),
            fail_auth: false,
            fail_delete: false,
        }
    }

    /// Player whose issued launch URL points endpoint and fetch at a closed
    /// local port, for tests that never reach those upstreams (or need them
    /// to fail fast).
    pub fn unroutable() -> Self {
        Self::new(launch_url_for("http://127.0.0.1:1"))
    }
}

#[async_trait]
impl PlayerApi for MockPlayer {
    async fn auth_token(&self, _player_tenant_id: &str) -> PlayerResult<String> {
        if self.fail_auth {
            return Err(PlayerError::UpstreamStatus {
                status: 500,
                message: "auth unavailable".to_string(),
            });
        }
        Ok("test-token".to_string())
    }

    async fn launch_url(
        &self,
        _token: &str,
        player_course_id: &str,
        au_index: u32,
        registration_code: &str,
        _actor: &Value,
    ) -> PlayerResult<PlayerLaunch> {
        self.launches.lock().unwrap().push((
            player_course_id.to_string(),
            au_index,
            registration_code.to_string(),
        ));
        Ok(PlayerLaunch {
            id: "player-session-1".to_string(),
            url: self.launch_url.clone(),
        })
    }

    async fn delete_course(&self, _token: &str, player_course_id: &str) -> PlayerResult<()> {
        self.deletions
            .lock()
            .unwrap()
            .push(player_course_id.to_string());
        if self.fail_delete {
            return Err(PlayerError::UpstreamStatus {
                status: 500,
                message: "delete refused".to_string(),
            });
        }
        Ok(())
    }
}

/// A gateway wired against an in-memory database and a scripted player,
/// with one tenant, course, and registration seeded.
pub struct TestApp {
    pub app: Router,
    pub player: Arc<MockPlayer>,
    /// Seeded registration ready to launch.
    pub registration_id: i64,
}

/// Build a player-style launch URL whose endpoint and fetch parameters
/// point at `base`, plus one extra parameter the rewrite must preserve.
pub fn launch_url_for(base: &str) -> String {
    format!("http://content.example/au/0/index.html?endpoint={base}/lrs&fetch={base}/fetch&x=1")
}

/// Create a test application with the default unroutable player.
pub async fn test_app() -> TestApp {
    test_app_with(MockPlayer::unroutable()).await
}

/// Create a test application around the given player.
pub async fn test_app_with(player: MockPlayer) -> TestApp {
    // Use in-memory database for tests
    let db = Database::in_memory().await.unwrap();

    let tenants = TenantRepository::new(db.pool().clone());
    let courses = CourseRepository::new(db.pool().clone());
    let registrations = RegistrationRepository::new(db.pool().clone());

    // Seed a launchable registration
    let tenant = tenants.create("acme", "pt-1").await.unwrap();
    let course = courses
        .create(tenant.id, "course-abc", "Golf Examples")
        .await
        .unwrap();
    let code = uuid::Uuid::new_v4().to_string();
    let actor = serde_json::json!({
        "account": { "homePage": "http://example.test", "name": "learner-1" }
    });
    let registration = registrations
        .create(tenant.id, course.id, &code, actor)
        .await
        .unwrap();

    let player = Arc::new(player);
    let player_api: Arc<dyn PlayerApi> = player.clone();
    let service = SessionService::new(
        SessionRepository::new(db.pool().clone()),
        registrations,
        courses,
        tenants,
        player_api,
    );

    let state = AppState::new(service);
    TestApp {
        app: api::create_router(state),
        player,
        registration_id: registration.id,
    }
}

/// Launch a session through the API and return the response JSON.
pub async fn create_session(app: &Router, registration_id: i64) -> Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/sessions")
                .method(Method::POST)
                .header(header::HOST, "gateway.test")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({ "testId": registration_id, "auIndex": 0 }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Bind a throwaway upstream server on an ephemeral port and return its
/// base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Read the next chunk from a streaming SSE body, with a timeout.
pub async fn next_sse_chunk(stream: &mut BodyDataStream) -> String {
    use tokio_stream::StreamExt;

    let chunk = tokio::time::timeout(std::time::Duration::from_secs(5), stream.next())
        .await
        .expect("timed out waiting for an event")
        .expect("event stream ended")
        .unwrap();
    String::from_utf8(chunk.to_vec()).unwrap()
}
