use std::error::Error as _;
use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - token may be expired: {0}")]
    Unauthorized(String),

    #[error("Bad gateway - upstream is restarting")]
    BadGateway,

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Phrases the service uses when a bearer token is no longer accepted.
const TOKEN_FAILURE_PHRASES: &[&str] = &[
    "invalid token",
    "token expired",
    "jwt expired",
    "jwt malformed",
    "unauthorized",
];

const ALREADY_CHECKED_IN: &str = "already checked in";

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Map a non-2xx status to an error. `message` is the `message`/`error`
    /// field of the JSON body when one could be parsed, else the raw body.
    pub fn from_status(status: reqwest::StatusCode, message: &str) -> Self {
        let truncated = Self::truncate_body(message);
        match status.as_u16() {
            401 => ApiError::Unauthorized(truncated),
            429 => ApiError::RateLimited,
            502 => ApiError::BadGateway,
            500..=599 => ApiError::ServerError {
                status: status.as_u16(),
                body: truncated,
            },
            _ if is_token_failure(&truncated) => ApiError::Unauthorized(truncated),
            _ => ApiError::Rejected(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Classify a `success: false` body that arrived with a 2xx status.
    pub fn from_rejection(message: &str) -> Self {
        let truncated = Self::truncate_body(message);
        if is_token_failure(&truncated) {
            ApiError::Unauthorized(truncated)
        } else {
            ApiError::Rejected(truncated)
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Transient failures worth retrying with backoff: 502, timeouts and
    /// dropped/reset connections.
    pub fn is_retryable_transport(&self) -> bool {
        match self {
            ApiError::BadGateway => true,
            ApiError::Network(e) => {
                e.is_timeout() || e.is_connect() || is_connection_reset(e)
            }
            _ => false,
        }
    }

    pub fn is_already_checked_in(&self) -> bool {
        match self {
            ApiError::Rejected(msg) => msg.to_lowercase().contains(ALREADY_CHECKED_IN),
            _ => false,
        }
    }
}

pub(crate) fn is_token_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    TOKEN_FAILURE_PHRASES.iter().any(|p| lower.contains(p))
}

fn is_connection_reset(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}
