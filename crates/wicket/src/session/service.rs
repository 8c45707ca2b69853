//! Session service - orchestrates AU launches against the upstream player.

use anyhow::{Context, Result};
use log::{error, info, warn};
use std::sync::Arc;

use crate::catalog::{CourseRepository, RegistrationRepository, TenantRepository};
use crate::player::PlayerApi;
use crate::rewrite;

use super::models::{LaunchedSession, NewSession, Session};
use super::repository::SessionRepository;

/// Service for launching and tearing down sessions.
#[derive(Clone)]
pub struct SessionService {
    sessions: SessionRepository,
    registrations: RegistrationRepository,
    courses: CourseRepository,
    tenants: TenantRepository,
    player: Arc<dyn PlayerApi>,
}

impl SessionService {
    /// Create a new session service.
    pub fn new(
        sessions: SessionRepository,
        registrations: RegistrationRepository,
        courses: CourseRepository,
        tenants: TenantRepository,
        player: Arc<dyn PlayerApi>,
    ) -> Self {
        Self {
            sessions,
            registrations,
            courses,
            tenants,
            player,
        }
    }

    /// Launch an AU session for a registration.
    ///
    /// Brokers the full launch against the player: auth token, launch URL,
    /// local persistence, then rewriting of the `endpoint` and `fetch` query
    /// parameters to gateway routes under `gateway_base`.
    pub async fn create_session(
        &self,
        registration_id: i64,
        au_index: u32,
        gateway_base: &str,
    ) -> Result<LaunchedSession> {
        let ctx = self
            .registrations
            .launch_context(registration_id)
            .await?
            .with_context(|| format!("registration {} not found", registration_id))?;

        let token = self.player.auth_token(&ctx.player_tenant_id).await?;

        let launch = self
            .player
            .launch_url(&token, &ctx.player_course_id, au_index, &ctx.code, &ctx.actor)
            .await?;

        let (endpoint, fetch_url) = rewrite::launch_parameters(&launch.url)
            .context("parsing launch URL issued by player")?;

        let new = NewSession {
            tenant_id: ctx.tenant_id,
            registration_id: ctx.registration_id,
            player_session_id: launch.id.clone(),
            launch_url: launch.url.clone(),
            endpoint,
            fetch_url,
        };

        let session = match self.sessions.create(&new).await {
            Ok(session) => session,
            Err(e) => {
                // The player already holds session state we cannot roll back.
                warn!(
                    "Failed to persist session for player session {}: {:?}",
                    launch.id, e
                );
                return Err(e);
            }
        };

        let launch_url = rewrite::replace_query_params(
            &launch.url,
            &[
                (
                    "endpoint",
                    format!("{}/sessions/{}/lrs", gateway_base, session.id).as_str(),
                ),
                (
                    "fetch",
                    format!("{}/sessions/{}/fetch", gateway_base, session.id).as_str(),
                ),
            ],
        )?;

        info!(
            "Created session {} for registration {} (AU {})",
            session.id, registration_id, au_index
        );

        Ok(LaunchedSession {
            session,
            launch_url,
        })
    }

    /// Get a session by ID.
    pub async fn get_session(&self, id: i64) -> Result<Option<Session>> {
        self.sessions.get(id).await
    }

    /// Delete a session by tearing down its whole course.
    ///
    /// Resolves session to registration to course, deletes the course on the
    /// player, then removes the local course row. Registrations and sessions
    /// go with it through foreign key cascades. Returns the IDs of every
    /// session the cascade removed, the addressed one included, so callers
    /// can end their observer streams. `None` when the session does not
    /// exist.
    pub async fn delete_session(&self, id: i64) -> Result<Option<Vec<i64>>> {
        let Some(session) = self.sessions.get(id).await? else {
            return Ok(None);
        };

        let registration = self
            .registrations
            .get(session.registration_id)
            .await?
            .with_context(|| {
                format!(
                    "registration {} not found for session {}",
                    session.registration_id, id
                )
            })?;

        // Collected before the delete; the cascade wipes these rows.
        let torn_down = self.sessions.ids_for_course(registration.course_id).await?;

        self.delete_by_course(registration.course_id).await?;
        Ok(Some(torn_down))
    }

    /// Delete a course upstream, then locally.
    ///
    /// The upstream delete must succeed (exactly 204) before any local row is
    /// touched; on upstream failure local state is left as it was.
    pub async fn delete_by_course(&self, course_id: i64) -> Result<()> {
        let course = self
            .courses
            .get(course_id)
            .await?
            .with_context(|| format!("course {} not found", course_id))?;

        let tenant = self
            .tenants
            .get(course.tenant_id)
            .await?
            .with_context(|| format!("tenant {} not found", course.tenant_id))?;

        let token = self.player.auth_token(&tenant.player_tenant_id).await?;
        self.player
            .delete_course(&token, &course.player_course_id)
            .await?;

        if let Err(e) = self.courses.delete(course.id).await {
            // At this point the player no longer knows the course but we
            // still do. Surface the split clearly.
            error!(
                "Upstream course {} deleted but local delete of course {} failed: {:?}",
                course.player_course_id, course.id, e
            );
            return Err(e);
        }

        info!("Deleted course {} and its sessions", course.id);
        Ok(())
    }
}
