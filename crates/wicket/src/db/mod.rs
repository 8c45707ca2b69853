//! SQLite-backed storage for the gateway.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Database connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database at `path` and bring the schema up to date.
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory: {}", parent.display()))?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .context("parsing database URL")?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(30))
            // Course deletes cascade through registrations to sessions.
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("connecting to database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Create an in-memory database (for testing).
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("parsing in-memory database URL")?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("connecting to in-memory database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("running database migrations")?;
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CourseRepository, RegistrationRepository, TenantRepository};
    use crate::session::{NewSession, SessionRepository};

    #[tokio::test]
    async fn test_new_creates_nested_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wicket.db");
        let db = Database::new(&path).await.unwrap();

        assert!(path.exists());
        sqlx::query("SELECT id FROM sessions")
            .fetch_all(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_course_delete_cascades_to_registrations_and_sessions() {
        let db = Database::in_memory().await.unwrap();
        let tenants = TenantRepository::new(db.pool().clone());
        let courses = CourseRepository::new(db.pool().clone());
        let registrations = RegistrationRepository::new(db.pool().clone());
        let sessions = SessionRepository::new(db.pool().clone());

        let tenant = tenants.create("t", "pt-1").await.unwrap();
        let course = courses.create(tenant.id, "c-1", "Course").await.unwrap();
        let registration = registrations
            .create(tenant.id, course.id, "reg-1", serde_json::json!({}))
            .await
            .unwrap();
        let session = sessions
            .create(&NewSession {
                tenant_id: tenant.id,
                registration_id: registration.id,
                player_session_id: "ps-1".to_string(),
                launch_url: "http://player/launch".to_string(),
                endpoint: "http://player/lrs".to_string(),
                fetch_url: "http://player/fetch".to_string(),
            })
            .await
            .unwrap();

        assert!(courses.delete(course.id).await.unwrap());
        assert!(registrations.get(registration.id).await.unwrap().is_none());
        assert!(sessions.get(session.id).await.unwrap().is_none());
    }
}
