//! Core library for monadscore-keeper.
//!
//! Keeps Monad Score nodes alive for a set of wallets: logs each wallet in,
//! starts its node, claims the daily check-in and refreshes the node's
//! start time on a fixed cadence while tracking points.

pub mod agent;
pub mod api;
pub mod config;
pub mod fleet;
pub mod models;
pub mod session;
pub mod utils;
pub mod wallet;

pub use agent::{AccountAgent, AgentError, AgentOptions, RetryPolicy};
pub use api::{ApiClient, ApiError};
pub use config::{AccountConfig, Settings};
pub use fleet::{AgentExit, AgentOutcome, Fleet};
pub use session::{Clock, Credential, PointsReport, SessionState, SystemClock};
pub use wallet::{LocalWallet, MessageSigner};
