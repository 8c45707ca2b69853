//! Session management module.
//!
//! Handles the lifecycle of AU sessions: brokering launches against the
//! upstream player, reading stored sessions, and tearing courses down.

mod models;
mod repository;
mod service;

pub use models::{CreateSessionRequest, LaunchedSession, NewSession, Session};
pub use repository::SessionRepository;
pub use service::SessionService;
