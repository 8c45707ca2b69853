//! Catalog database repositories.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::types::Json;

use super::models::{Course, LaunchContext, Registration, Tenant};

/// Repository for tenant rows.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    pool: SqlitePool,
}

impl TenantRepository {
    /// Create a new repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Provision a tenant handle.
    pub async fn create(&self, code: &str, player_tenant_id: &str) -> Result<Tenant> {
        let created_at = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO tenants (code, player_tenant_id, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(code)
        .bind(player_tenant_id)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .context("creating tenant")?;

        Ok(Tenant {
            id: result.last_insert_rowid(),
            code: code.to_string(),
            player_tenant_id: player_tenant_id.to_string(),
            created_at,
        })
    }

    /// Get a tenant by ID.
    pub async fn get(&self, id: i64) -> Result<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, code, player_tenant_id, created_at
            FROM tenants
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching tenant")?;

        Ok(tenant)
    }
}

/// Repository for course rows.
#[derive(Debug, Clone)]
pub struct CourseRepository {
    pool: SqlitePool,
}

impl CourseRepository {
    /// Create a new repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a course imported into the player.
    pub async fn create(&self, tenant_id: i64, player_course_id: &str, title: &str) -> Result<Course> {
        let created_at = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO courses (tenant_id, player_course_id, title, metadata, created_at)
            VALUES (?, ?, ?, '{}', ?)
            "#,
        )
        .bind(tenant_id)
        .bind(player_course_id)
        .bind(title)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .context("creating course")?;

        Ok(Course {
            id: result.last_insert_rowid(),
            tenant_id,
            player_course_id: player_course_id.to_string(),
            title: title.to_string(),
            metadata: Json(Value::Object(Default::default())),
            created_at,
        })
    }

    /// Get a course by ID.
    pub async fn get(&self, id: i64) -> Result<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, tenant_id, player_course_id, title, metadata, created_at
            FROM courses
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching course")?;

        Ok(course)
    }

    /// Delete a course row. Registrations and sessions go with it via
    /// foreign-key cascade. Returns whether a row was removed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("deleting course")?;

        Ok(result.rows_affected() > 0)
    }
}

/// Repository for registration rows.
#[derive(Debug, Clone)]
pub struct RegistrationRepository {
    pool: SqlitePool,
}

impl RegistrationRepository {
    /// Create a new repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a registration against a course.
    pub async fn create(
        &self,
        tenant_id: i64,
        course_id: i64,
        code: &str,
        actor: Value,
    ) -> Result<Registration> {
        let created_at = Utc::now().to_rfc3339();
        let actor = Json(actor);
        let result = sqlx::query(
            r#"
            INSERT INTO registrations (tenant_id, course_id, code, actor, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(tenant_id)
        .bind(course_id)
        .bind(code)
        .bind(&actor)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .context("creating registration")?;

        Ok(Registration {
            id: result.last_insert_rowid(),
            tenant_id,
            course_id,
            code: code.to_string(),
            actor,
            created_at,
        })
    }

    /// Get a registration by ID.
    pub async fn get(&self, id: i64) -> Result<Option<Registration>> {
        let registration = sqlx::query_as::<_, Registration>(
            r#"
            SELECT id, tenant_id, course_id, code, actor, created_at
            FROM registrations
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching registration")?;

        Ok(registration)
    }

    /// Resolve a registration together with its course and tenant, as needed
    /// to launch an AU.
    pub async fn launch_context(&self, id: i64) -> Result<Option<LaunchContext>> {
        let ctx = sqlx::query_as::<_, LaunchContext>(
            r#"
            SELECT r.id AS registration_id, r.tenant_id, r.course_id, r.code, r.actor,
                   t.player_tenant_id, c.player_course_id
            FROM registrations r
            JOIN courses c ON c.id = r.course_id
            JOIN tenants t ON t.id = r.tenant_id
            WHERE r.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("resolving registration for launch")?;

        Ok(ctx)
    }
}
