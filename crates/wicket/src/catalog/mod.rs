//! Catalog of launchable content: tenants, courses, and registrations.
//!
//! These rows are provisioned by the surrounding harness; the gateway reads
//! them to launch sessions and deletes courses as part of the cascading
//! teardown flow.

mod models;
mod repository;

pub use models::{Course, LaunchContext, Registration, Tenant};
pub use repository::{CourseRepository, RegistrationRepository, TenantRepository};
