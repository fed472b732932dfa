//! Runtime settings.
//!
//! Settings come from environment variables (the binary loads `.env`
//! first). Accounts may alternatively be listed in a JSON file given by
//! `ACCOUNTS_FILE`, or found at `~/.config/monadscore/accounts.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::agent::{AgentOptions, RetryPolicy};
use crate::api::{DEFAULT_API_URL, DEFAULT_ORIGIN, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Application name used for the config directory path
const APP_NAME: &str = "monadscore";

/// Accounts file name
const ACCOUNTS_FILE: &str = "accounts.json";

/// One wallet to keep alive.
#[derive(Clone, Deserialize)]
pub struct AccountConfig {
    pub private_key: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Overrides the global `API_URL` for this wallet.
    #[serde(default)]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("private_key", &"<redacted>")
            .field("has_token", &self.token.is_some())
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub accounts: Vec<AccountConfig>,
    pub api_url: String,
    pub origin: String,
    pub request_timeout: Duration,
    pub agent: AgentOptions,
    pub log_dir: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars, Self::default_accounts_path())
    }

    /// Load settings from `vars`, falling back to `default_accounts` when no
    /// key is configured through variables.
    pub fn from_vars(
        vars: &HashMap<String, String>,
        default_accounts: Option<PathBuf>,
    ) -> Result<Self> {
        let accounts = load_accounts(vars, default_accounts)?;

        let retry = RetryPolicy {
            max_retries: parse_var(vars, "MAX_RETRIES", RetryPolicy::default().max_retries)?,
            backoff_base: Duration::from_millis(parse_var(
                vars,
                "BACKOFF_BASE_MS",
                crate::agent::retry::DEFAULT_BACKOFF_BASE_MS,
            )?),
            retry_delay: Duration::from_millis(parse_var(
                vars,
                "RETRY_DELAY_MS",
                crate::agent::retry::DEFAULT_RETRY_DELAY_MS,
            )?),
        };

        let max_restarts: u32 = parse_var(
            vars,
            "MAX_RESTARTS",
            crate::agent::account::DEFAULT_MAX_RESTARTS,
        )?;

        let agent = AgentOptions {
            retry,
            tick_interval: Duration::from_secs(parse_var(
                vars,
                "TICK_INTERVAL_SECS",
                crate::agent::account::DEFAULT_TICK_INTERVAL_SECS,
            )?),
            restart_delay: Duration::from_secs(parse_var(
                vars,
                "RESTART_DELAY_SECS",
                crate::agent::account::DEFAULT_RESTART_DELAY_SECS,
            )?),
            // 0 means never stop restarting
            max_restarts: (max_restarts > 0).then_some(max_restarts),
            sign_login: parse_flag(vars, "SIGN_LOGIN")?,
        };

        if agent.tick_interval.is_zero() {
            bail!("TICK_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            accounts,
            api_url: non_empty(vars, "API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            origin: non_empty(vars, "ORIGIN").unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
            request_timeout: Duration::from_secs(parse_var(
                vars,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            agent,
            log_dir: non_empty(vars, "LOG_DIR").map(PathBuf::from),
        })
    }

    fn default_accounts_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(ACCOUNTS_FILE))
    }
}

fn load_accounts(
    vars: &HashMap<String, String>,
    default_accounts: Option<PathBuf>,
) -> Result<Vec<AccountConfig>> {
    if let Some(path) = non_empty(vars, "ACCOUNTS_FILE") {
        return read_accounts_file(Path::new(&path));
    }

    let keys = split_list(
        non_empty(vars, "PRIVATE_KEYS")
            .or_else(|| non_empty(vars, "PRIVATE_KEY"))
            .as_deref()
            .unwrap_or_default(),
    );

    if keys.is_empty() {
        if let Some(path) = default_accounts.filter(|p| p.exists()) {
            return read_accounts_file(&path);
        }
        bail!("No private keys configured; set PRIVATE_KEYS or PRIVATE_KEY");
    }

    // JWT_TOKENS lines up with the key list; a lone JWT_TOKEN belongs to the first key
    let mut tokens: Vec<Option<String>> = match non_empty(vars, "JWT_TOKENS") {
        Some(list) => list
            .split(',')
            .map(|t| Some(t.trim().to_string()).filter(|t| !t.is_empty()))
            .collect(),
        None => vec![non_empty(vars, "JWT_TOKEN")],
    };
    tokens.resize(keys.len(), None);

    Ok(keys
        .into_iter()
        .zip(tokens)
        .map(|(private_key, token)| AccountConfig {
            private_key,
            token,
            api_url: None,
        })
        .collect())
}

fn read_accounts_file(path: &Path) -> Result<Vec<AccountConfig>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read accounts file: {}", path.display()))?;
    let accounts: Vec<AccountConfig> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse accounts file: {}", path.display()))?;
    let accounts: Vec<AccountConfig> = accounts
        .into_iter()
        .filter(|a| !a.private_key.trim().is_empty())
        .collect();
    if accounts.is_empty() {
        bail!("Accounts file {} lists no private keys", path.display());
    }
    Ok(accounts)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(vars: &HashMap<String, String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty(vars, name) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", name, raw)),
        None => Ok(default),
    }
}

fn parse_flag(vars: &HashMap<String, String>, name: &str) -> Result<bool> {
    match non_empty(vars, name).map(|v| v.to_lowercase()).as_deref() {
        None | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some(other) => bail!("Invalid value for {}: {:?}", name, other),
    }
}
