//! Account agents and their retry policy.
//!
//! This module provides:
//! - `AccountAgent`: login, start, keep-alive, check-in and points polling
//!   for one wallet, plus the loop that drives them
//! - `RetryPolicy`: attempt budget, exponential backoff and fixed delay
//! - `AgentError`: failures an agent reports to its caller

pub mod account;
pub mod error;
pub mod retry;

pub use account::{AccountAgent, AgentOptions};
pub use error::AgentError;
pub use retry::RetryPolicy;
