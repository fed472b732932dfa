//! Data models for Monad Score API payloads.
//!
//! - `ApiEnvelope`: the `{success, token, message, ...}` wrapper every
//!   endpoint answers with
//! - `NodeStatus`: the `user` record returned by the login endpoint

pub mod user;

pub use user::{ApiEnvelope, NodeStatus};
