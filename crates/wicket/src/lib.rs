//! Session Gateway Library
//!
//! Brokers cmi5 AU launches against an upstream player, rewrites launch
//! URLs to gateway-scoped routes, reverse-proxies the resulting xAPI and
//! token-fetch traffic, and streams per-session proxy events to observers.

pub mod api;
pub mod catalog;
pub mod db;
pub mod events;
pub mod player;
pub mod rewrite;
pub mod session;
