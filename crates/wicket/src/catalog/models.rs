//! Catalog data models.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use sqlx::types::Json;

/// A local handle for an upstream player tenant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    /// Unique tenant ID.
    pub id: i64,
    /// Human-readable tenant code.
    pub code: String,
    /// Upstream tenant reference used when requesting auth tokens.
    #[serde(skip_serializing)]
    pub player_tenant_id: String,
    /// When the tenant was provisioned.
    pub created_at: String,
}

/// A course imported into the upstream player.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Unique course ID.
    pub id: i64,
    /// Owning tenant.
    pub tenant_id: i64,
    /// Upstream course reference used for launch and delete calls.
    #[serde(skip_serializing)]
    pub player_course_id: String,
    /// Course title.
    pub title: String,
    /// Free-form metadata.
    pub metadata: Json<Value>,
    /// When the course was registered.
    pub created_at: String,
}

/// A learner registration against a course.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Unique registration ID.
    pub id: i64,
    /// Owning tenant.
    pub tenant_id: i64,
    /// Registered course.
    pub course_id: i64,
    /// Upstream registration reference passed on launch.
    pub code: String,
    /// xAPI actor identity for the registered learner.
    pub actor: Json<Value>,
    /// When the registration was created.
    pub created_at: String,
}

/// A registration joined with its course and tenant, carrying everything the
/// launch flow needs in one row.
#[derive(Debug, Clone, FromRow)]
pub struct LaunchContext {
    /// Registration ID.
    pub registration_id: i64,
    /// Owning tenant ID.
    pub tenant_id: i64,
    /// Registered course ID.
    pub course_id: i64,
    /// Upstream registration reference.
    pub code: String,
    /// xAPI actor identity.
    pub actor: Json<Value>,
    /// Upstream tenant reference.
    pub player_tenant_id: String,
    /// Upstream course reference.
    pub player_course_id: String,
}
