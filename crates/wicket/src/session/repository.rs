//! Session database repository.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use super::models::{NewSession, Session};

/// Repository for session persistence.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Create a new repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a session row and return the stored record.
    pub async fn create(&self, new: &NewSession) -> Result<Session> {
        let created_at = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO sessions (
                tenant_id, registration_id, player_session_id,
                launch_url, endpoint, fetch_url, metadata, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, '{}', ?)
            "#,
        )
        .bind(new.tenant_id)
        .bind(new.registration_id)
        .bind(&new.player_session_id)
        .bind(&new.launch_url)
        .bind(&new.endpoint)
        .bind(&new.fetch_url)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .context("creating session")?;

        Ok(Session {
            id: result.last_insert_rowid(),
            tenant_id: new.tenant_id,
            registration_id: new.registration_id,
            player_session_id: new.player_session_id.clone(),
            launch_url: new.launch_url.clone(),
            endpoint: new.endpoint.clone(),
            fetch_url: new.fetch_url.clone(),
            metadata: sqlx::types::Json(serde_json::json!({})),
            created_at,
        })
    }

    /// IDs of every session launched under a course, via its registrations.
    pub async fn ids_for_course(&self, course_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT s.id
            FROM sessions s
            JOIN registrations r ON r.id = s.registration_id
            WHERE r.course_id = ?
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .context("listing sessions for course")?;

        Ok(ids)
    }

    /// Get a session by ID.
    pub async fn get(&self, id: i64) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, tenant_id, registration_id, player_session_id,
                   launch_url, endpoint, fetch_url, metadata, created_at
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching session")?;

        Ok(session)
    }
}
