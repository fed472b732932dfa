//! Per-account session state.
//!
//! Nothing here is persisted: a restart begins from defaults and the agent
//! logs in and starts its node again.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate};

use crate::models::NodeStatus;
use crate::wallet::MessageSigner;

/// Source of wall-clock time, swappable so day rollover can be driven in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Wallet identity plus the bearer token currently issued to it.
#[derive(Clone)]
pub struct Credential {
    signer: Arc<dyn MessageSigner>,
    token: Option<String>,
}

impl Credential {
    pub fn new(signer: Arc<dyn MessageSigner>, token: Option<String>) -> Self {
        Self {
            signer,
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn wallet_address(&self) -> &str {
        self.signer.address()
    }

    pub fn signer(&self) -> &dyn MessageSigner {
        self.signer.as_ref()
    }

    /// Get the bearer token if one has been issued
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Replace the token, ignoring empty values.
    pub fn set_token(&mut self, token: &str) {
        if !token.is_empty() {
            self.token = Some(token.to_string());
        }
    }

    /// Drop the token so the next call logs in again.
    pub fn invalidate(&mut self) {
        self.token = None;
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("wallet", &self.wallet_address())
            .field("has_token", &self.has_token())
            .finish()
    }
}

/// Outcome of recording a points observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointsReport {
    pub total: f64,
    /// Change since the previous poll; `None` on the first observation.
    pub gained: Option<f64>,
    /// Change since the first observation of this process.
    pub session_gain: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub is_running: bool,
    pub last_points: f64,
    pub session_start_points: Option<f64>,
    pub last_check_in: Option<DateTime<Local>>,
    pub checked_in_today: bool,
    pub node_status: Option<NodeStatus>,
}

impl SessionState {
    /// Clear `checked_in_today` when `today` is not the day of the last check-in.
    /// Returns true when the flag was reset.
    pub fn roll_day(&mut self, today: NaiveDate) -> bool {
        let same_day = self
            .last_check_in
            .map(|at| at.date_naive() == today)
            .unwrap_or(false);
        if self.checked_in_today && !same_day {
            self.checked_in_today = false;
            return true;
        }
        false
    }

    /// Whether a check-in is still owed for `today`.
    pub fn needs_check_in(&mut self, today: NaiveDate) -> bool {
        self.roll_day(today);
        !self.checked_in_today
    }

    pub fn mark_checked_in(&mut self, at: DateTime<Local>) {
        self.checked_in_today = true;
        self.last_check_in = Some(at);
    }

    pub fn record_points(&mut self, total: f64) -> PointsReport {
        let gained = self.session_start_points.map(|_| total - self.last_points);
        let start = *self.session_start_points.get_or_insert(total);
        self.last_points = total;
        PointsReport {
            total,
            gained,
            session_gain: total - start,
        }
    }
}
