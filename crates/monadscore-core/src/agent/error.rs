use thiserror::Error;

use crate::api::ApiError;
use crate::wallet::SignerError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Bearer token expired or malformed - refresh the credential: {0}")]
    TokenExpired(String),

    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("{call} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        call: &'static str,
        attempts: u32,
        #[source]
        last: ApiError,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Gave up after {0} restarts")]
    RestartLimit(u32),
}

impl AgentError {
    /// Failures that only an operator can fix.
    pub fn needs_new_credential(&self) -> bool {
        matches!(self, AgentError::TokenExpired(_) | AgentError::Signing(_))
    }
}
