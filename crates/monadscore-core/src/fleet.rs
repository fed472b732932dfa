//! Runs one `AccountAgent` per configured wallet.

use std::sync::Arc;

use anyhow::{bail, Result};
use futures::future::join_all;
use tracing::{error, info, warn};

use crate::agent::{AccountAgent, AgentError};
use crate::api::ApiClient;
use crate::config::Settings;
use crate::session::Credential;
use crate::wallet::LocalWallet;

/// How an agent task ended.
#[derive(Debug)]
pub enum AgentOutcome {
    Finished,
    Failed(AgentError),
    Panicked(String),
}

#[derive(Debug)]
pub struct AgentExit {
    pub wallet: String,
    pub outcome: AgentOutcome,
}

pub struct Fleet {
    agents: Vec<AccountAgent>,
}

impl Fleet {
    pub fn new(agents: Vec<AccountAgent>) -> Self {
        Self { agents }
    }

    /// Build one agent per account, sharing a single HTTP connection pool.
    /// Accounts whose key does not parse are logged and skipped.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api = ApiClient::new(&settings.api_url, &settings.origin, settings.request_timeout)?;

        let mut agents = Vec::with_capacity(settings.accounts.len());
        for (index, account) in settings.accounts.iter().enumerate() {
            let wallet = match LocalWallet::from_private_key(&account.private_key) {
                Ok(wallet) => wallet,
                Err(e) => {
                    error!(account = index + 1, error = %e, "Skipping account with invalid private key");
                    continue;
                }
            };

            let api = match account.api_url.as_deref() {
                Some(url) => api.with_base_url(url),
                None => api.clone(),
            };
            let credential = Credential::new(Arc::new(wallet), account.token.clone());
            agents.push(AccountAgent::new(api, credential, settings.agent.clone()));
        }

        if agents.is_empty() {
            bail!("No usable accounts configured");
        }

        info!(count = agents.len(), "Initialized agents");
        Ok(Self { agents })
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn wallets(&self) -> Vec<String> {
        self.agents
            .iter()
            .map(|a| a.wallet_address().to_string())
            .collect()
    }

    /// Spawn every agent on its own task and wait for all of them.
    ///
    /// Agents normally run forever; this only returns once each one has
    /// stopped. One agent failing never stops the others.
    pub async fn run(self) -> Vec<AgentExit> {
        info!(count = self.agents.len(), "Starting all agents");

        let (wallets, handles): (Vec<String>, Vec<_>) = self
            .agents
            .into_iter()
            .map(|agent| {
                let wallet = agent.wallet_address().to_string();
                (wallet, tokio::spawn(agent.run()))
            })
            .unzip();

        join_all(handles)
            .await
            .into_iter()
            .zip(wallets)
            .map(|(joined, wallet)| {
                let outcome = match joined {
                    Ok(Ok(())) => {
                        warn!(wallet = %wallet, "Agent stopped");
                        AgentOutcome::Finished
                    }
                    Ok(Err(e)) => {
                        error!(wallet = %wallet, error = %e, "Agent failed");
                        AgentOutcome::Failed(e)
                    }
                    Err(e) => {
                        error!(wallet = %wallet, error = %e, "Agent task panicked");
                        AgentOutcome::Panicked(e.to_string())
                    }
                };
                AgentExit { wallet, outcome }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_settings_skips_bad_keys() {
        let vars: HashMap<String, String> = [(
            "PRIVATE_KEYS".to_string(),
            "0xnothex,0x0000000000000000000000000000000000000000000000000000000000000001"
                .to_string(),
        )]
        .into_iter()
        .collect();
        let settings = Settings::from_vars(&vars, None).expect("settings load");

        let fleet = Fleet::from_settings(&settings).expect("fleet builds");
        assert_eq!(fleet.len(), 1);
        assert_eq!(fleet.wallets(), vec!["0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"]);
    }

    #[test]
    fn test_from_settings_without_usable_keys() {
        let vars: HashMap<String, String> =
            [("PRIVATE_KEY".to_string(), "0x01".to_string())].into_iter().collect();
        let settings = Settings::from_vars(&vars, None).expect("settings load");
        assert!(Fleet::from_settings(&settings).is_err());
    }
}
