//! The per-wallet keeper.
//!
//! An `AccountAgent` owns one credential and its session state. It logs in,
//! starts the node, checks in once per day and then keeps the node alive
//! on a fixed cadence while tracking points.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::api::endpoints::{self, CallArgs, Endpoint};
use crate::api::{ApiClient, ApiError};
use crate::models::{ApiEnvelope, NodeStatus};
use crate::session::{Clock, Credential, PointsReport, SessionState, SystemClock};
use crate::utils::{describe_points, format_points, short_address, truncate_string};
use crate::wallet::start_message;

use super::{AgentError, RetryPolicy};

// ============================================================================
// Constants
// ============================================================================

/// Default cadence of keep-alive ticks.
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 30;

/// Default pause before re-running a failed startup sequence.
pub const DEFAULT_RESTART_DELAY_SECS: u64 = 30;

/// Default number of startup restarts before an agent gives up.
pub const DEFAULT_MAX_RESTARTS: u32 = 10;

/// Longest server message echoed into a log line.
const MAX_LOGGED_MESSAGE_LENGTH: usize = 120;

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub retry: RetryPolicy,
    pub tick_interval: Duration,
    pub restart_delay: Duration,
    /// `None` restarts forever.
    pub max_restarts: Option<u32>,
    /// Send a signed ownership message with the login call.
    pub sign_login: bool,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
            restart_delay: Duration::from_secs(DEFAULT_RESTART_DELAY_SECS),
            max_restarts: Some(DEFAULT_MAX_RESTARTS),
            sign_login: false,
        }
    }
}

pub struct AccountAgent {
    api: ApiClient,
    credential: Credential,
    state: SessionState,
    options: AgentOptions,
    clock: Arc<dyn Clock>,
    label: String,
}

impl AccountAgent {
    pub fn new(api: ApiClient, credential: Credential, options: AgentOptions) -> Self {
        let label = short_address(credential.wallet_address());
        Self {
            api,
            credential,
            state: SessionState::default(),
            options,
            clock: Arc::new(SystemClock),
            label,
        }
    }

    /// Replace the wall clock, e.g. to drive day rollover.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn wallet_address(&self) -> &str {
        self.credential.wallet_address()
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    // ===== Calls =====

    /// Exchange the wallet for a bearer token. Never errors; false on any failure.
    pub async fn authenticate(&mut self) -> bool {
        info!(wallet = %self.label, "Attempting to login");
        let wallet = self.wallet_address().to_string();

        let signed = if self.options.sign_login {
            let message = start_message(&wallet);
            match self.credential.signer().sign_message(&message) {
                Ok(signature) => Some((message, signature)),
                Err(e) => {
                    error!(wallet = %self.label, error = %e, "Failed to sign login message");
                    return false;
                }
            }
        } else {
            None
        };

        let args = CallArgs {
            wallet: &wallet,
            start_time: self.now_millis(),
            message: signed.as_ref().map(|(m, _)| m.as_str()),
            signature: signed.as_ref().map(|(_, s)| s.as_str()),
        };

        let result = self.api.call(&endpoints::LOGIN, &args, None).await;
        match result {
            Ok(resp) => match resp.fresh_token() {
                Some(token) => {
                    self.credential.set_token(token);
                    info!(wallet = %self.label, "Login successful");
                    true
                }
                None => {
                    warn!(wallet = %self.label, "Login response carried no token");
                    false
                }
            },
            Err(e) => {
                warn!(wallet = %self.label, error = %e, "Login failed");
                false
            }
        }
    }

    /// Sign the start message and register the node as started.
    ///
    /// 502s, timeouts and dropped connections are retried with exponential
    /// backoff. Anything else is returned; a rejected token surfaces as
    /// `AgentError::TokenExpired` and clears the stored token.
    pub async fn start_node(&mut self) -> Result<(), AgentError> {
        let wallet = self.wallet_address().to_string();
        let message = start_message(&wallet);
        let max = self.options.retry.max_retries;
        let mut attempt = 0;

        loop {
            let signature = self.credential.signer().sign_message(&message)?;
            info!(wallet = %self.label, attempt = attempt + 1, max = max, "Starting node");

            let args = CallArgs {
                wallet: &wallet,
                start_time: self.now_millis(),
                message: None,
                signature: Some(&signature),
            };
            let result = self.authorized_call(&endpoints::START_NODE, &args).await;

            match result {
                Ok(resp) => {
                    self.absorb_token(&resp);
                    self.state.is_running = true;
                    info!(wallet = %self.label, server = %self.server_message(&resp), "Node started");
                    return Ok(());
                }
                Err(e) if e.is_unauthorized() => {
                    self.credential.invalidate();
                    error!(wallet = %self.label, error = %e, "Token rejected while starting node");
                    return Err(AgentError::TokenExpired(e.to_string()));
                }
                Err(e) if e.is_retryable_transport() => {
                    if !self.options.retry.has_attempt_after(attempt) {
                        error!(wallet = %self.label, attempts = attempt + 1, error = %e, "Giving up starting node");
                        return Err(AgentError::RetriesExhausted {
                            call: endpoints::START_NODE.name,
                            attempts: attempt + 1,
                            last: e,
                        });
                    }
                    attempt += 1;
                    let wait = self.options.retry.backoff_delay(attempt);
                    warn!(
                        wallet = %self.label,
                        error = %e,
                        backoff_ms = wait.as_millis() as u64,
                        "Transient failure starting node, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    error!(wallet = %self.label, error = %e, "Starting node failed");
                    return Err(e.into());
                }
            }
        }
    }

    /// Refresh the node's start time so the server keeps counting uptime.
    ///
    /// Retries any failure after a constant delay. One authorization
    /// failure per call triggers a fresh login and a free retry.
    pub async fn update_start_time(&mut self) -> bool {
        if !self.credential.has_token() {
            self.authenticate().await;
        }

        let wallet = self.wallet_address().to_string();
        let max = self.options.retry.max_retries;
        let mut attempt = 0;
        let mut reauthenticated = false;

        loop {
            debug!(wallet = %self.label, attempt = attempt + 1, max = max, "Updating start time");
            let args = CallArgs {
                wallet: &wallet,
                start_time: self.now_millis(),
                ..Default::default()
            };
            let result = self.authorized_call(&endpoints::KEEP_ALIVE, &args).await;

            match result {
                Ok(resp) => {
                    self.absorb_token(&resp);
                    self.state.is_running = true;
                    info!(wallet = %self.label, server = %self.server_message(&resp), "Start time updated");
                    return true;
                }
                Err(e) if e.is_unauthorized() && !reauthenticated => {
                    reauthenticated = true;
                    warn!(wallet = %self.label, "Token expired, attempting to login again");
                    self.credential.invalidate();
                    self.authenticate().await;
                }
                Err(e) => {
                    warn!(wallet = %self.label, attempt = attempt + 1, error = %e, "Error updating start time");
                    if !self.options.retry.has_attempt_after(attempt) {
                        error!(wallet = %self.label, attempts = attempt + 1, "Keep-alive failed, will try next tick");
                        return false;
                    }
                    attempt += 1;
                    debug!(
                        wallet = %self.label,
                        delay_ms = self.options.retry.retry_delay.as_millis() as u64,
                        "Retrying keep-alive"
                    );
                    tokio::time::sleep(self.options.retry.retry_delay).await;
                }
            }
        }
    }

    /// Claim today's check-in bonus. No request is made once today is done.
    pub async fn check_in(&mut self) -> bool {
        let now = self.clock.now();
        if !self.state.needs_check_in(now.date_naive()) {
            debug!(wallet = %self.label, "Already checked in today, skipping");
            return true;
        }

        if !self.credential.has_token() {
            self.authenticate().await;
        }

        let wallet = self.wallet_address().to_string();
        let args = CallArgs {
            wallet: &wallet,
            ..Default::default()
        };
        let result = self.authorized_call(&endpoints::CHECK_IN, &args).await;

        match result {
            Ok(resp) => {
                self.absorb_token(&resp);
                if endpoints::is_already_checked_in(&resp) {
                    info!(wallet = %self.label, "Server reports already checked in today");
                } else {
                    info!(wallet = %self.label, "Daily check-in successful");
                }
                self.state.mark_checked_in(now);
                true
            }
            Err(e) if e.is_already_checked_in() => {
                info!(wallet = %self.label, "Server reports already checked in today");
                self.state.mark_checked_in(now);
                true
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.credential.invalidate();
                }
                warn!(wallet = %self.label, error = %e, "Daily check-in failed");
                false
            }
        }
    }

    /// Fetch the point total and node record, logging the change since last poll.
    pub async fn poll_points(&mut self) -> Option<PointsReport> {
        if !self.credential.has_token() {
            self.authenticate().await;
        }

        let wallet = self.wallet_address().to_string();
        let mut reauthenticated = false;

        loop {
            let args = CallArgs {
                wallet: &wallet,
                ..Default::default()
            };
            let result = self.authorized_call(&endpoints::POINTS, &args).await;

            match result {
                Ok(resp) => {
                    self.absorb_token(&resp);
                    if let Some(user) = resp.node_status() {
                        self.record_status(user);
                    }

                    let Some(total) = resp.total_points() else {
                        warn!(wallet = %self.label, "Points response carried no total");
                        return None;
                    };
                    let report = self.state.record_points(total);
                    info!(
                        wallet = %self.label,
                        session_gain = %format_points(report.session_gain),
                        "{}",
                        describe_points(&report)
                    );
                    return Some(report);
                }
                Err(e) if e.is_unauthorized() && !reauthenticated => {
                    reauthenticated = true;
                    warn!(wallet = %self.label, "Token expired, attempting to login again");
                    self.credential.invalidate();
                    self.authenticate().await;
                }
                Err(e) => {
                    warn!(wallet = %self.label, error = %e, "Error checking points");
                    return None;
                }
            }
        }
    }

    // ===== Loop =====

    /// Login (when needed), start the node, check in and take a first points reading.
    pub async fn initialize(&mut self) -> Result<(), AgentError> {
        info!(wallet = %self.wallet_address(), "Agent starting");

        if !self.credential.has_token() && !self.authenticate().await {
            warn!(wallet = %self.label, "Authentication failed, trying to start anyway");
        }

        self.start_node().await?;
        self.check_in().await;
        self.poll_points().await;
        Ok(())
    }

    /// One scheduled pass: check in on a new day, refresh start time, poll points.
    pub async fn tick(&mut self) {
        if self.state.roll_day(self.clock.today()) {
            info!(wallet = %self.label, "New day, checking in again");
        }
        self.check_in().await;
        self.update_start_time().await;
        self.poll_points().await;
    }

    /// Run the startup sequence until it succeeds, then tick forever.
    ///
    /// Startup failures restart the whole sequence after `restart_delay`,
    /// up to `max_restarts` times. Ticks run on this task one after another,
    /// so calls for one wallet never overlap.
    pub async fn run(mut self) -> Result<(), AgentError> {
        self.startup_with_restarts().await?;

        let mut ticker = tokio::time::interval(self.options.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    async fn startup_with_restarts(&mut self) -> Result<(), AgentError> {
        let mut restarts = 0u32;
        loop {
            match self.initialize().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if let Some(max) = self.options.max_restarts {
                        if restarts >= max {
                            error!(wallet = %self.label, error = %e, restarts = restarts, "Startup keeps failing, stopping agent");
                            return Err(AgentError::RestartLimit(restarts));
                        }
                    }
                    restarts += 1;
                    if e.needs_new_credential() {
                        warn!(wallet = %self.label, "Credential may need manual refresh");
                    }
                    error!(
                        wallet = %self.label,
                        error = %e,
                        restart = restarts,
                        delay_secs = self.options.restart_delay.as_secs(),
                        "Startup failed, restarting"
                    );
                    tokio::time::sleep(self.options.restart_delay).await;
                }
            }
        }
    }

    // ===== Helpers =====

    async fn authorized_call(
        &self,
        endpoint: &Endpoint,
        args: &CallArgs<'_>,
    ) -> Result<ApiEnvelope, ApiError> {
        self.api.call(endpoint, args, self.credential.token()).await
    }

    /// Honour a token rotated in by any response.
    fn absorb_token(&mut self, resp: &ApiEnvelope) {
        if let Some(token) = resp.fresh_token() {
            if self.credential.token() != Some(token) {
                debug!(wallet = %self.label, "Token rotated");
                self.credential.set_token(token);
            }
        }
    }

    /// Store the node record. Uptime lags a fresh start, so it may only
    /// raise `is_running`, never clear it.
    fn record_status(&mut self, status: NodeStatus) {
        if status.is_running() {
            self.state.is_running = true;
        }
        debug!(
            wallet = %self.label,
            uptime = %status.uptime_display(),
            active_days = status.active_days.unwrap_or_default(),
            last_check_in = status.last_check_in_date.as_deref().unwrap_or("never"),
            next_target = %status.next_total_points.map(format_points).unwrap_or_default(),
            started_at = %status
                .started_at()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            "Node status"
        );
        self.state.node_status = Some(status);
    }

    fn server_message(&self, resp: &ApiEnvelope) -> String {
        truncate_string(resp.reason().unwrap_or("ok"), MAX_LOGGED_MESSAGE_LENGTH)
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }
}
