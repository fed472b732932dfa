//! REST API client module for the Monad Score service.
//!
//! This module provides the `ApiClient` and the endpoint table it is
//! driven by. Authorized calls carry the JWT bearer token obtained from
//! the login endpoint.

pub mod client;
pub mod endpoints;
pub mod error;

pub use client::{ApiClient, DEFAULT_API_URL, DEFAULT_ORIGIN, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use endpoints::{CallArgs, Endpoint, HttpMethod};
pub use error::ApiError;
