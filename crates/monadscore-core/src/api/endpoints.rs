//! Declarative table of the Monad Score calls.
//!
//! Each `Endpoint` names its method, path, whether it needs the bearer
//! token, how to build its JSON body and how to decide success from the
//! response envelope. `ApiClient::call` is the only consumer.

use serde_json::{json, Value};

use crate::models::ApiEnvelope;

/// HTTP verbs used by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
        }
    }
}

/// Inputs available to body builders.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallArgs<'a> {
    pub wallet: &'a str,
    /// Milliseconds since the Unix epoch.
    pub start_time: i64,
    pub message: Option<&'a str>,
    pub signature: Option<&'a str>,
}

pub struct Endpoint {
    pub name: &'static str,
    pub method: HttpMethod,
    pub path: &'static str,
    pub authorized: bool,
    pub body: fn(&CallArgs<'_>) -> Value,
    pub success: fn(&ApiEnvelope) -> bool,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("authorized", &self.authorized)
            .finish()
    }
}

pub const LOGIN: Endpoint = Endpoint {
    name: "login",
    method: HttpMethod::Post,
    path: "/user/login",
    authorized: false,
    body: login_body,
    success: has_token,
};

pub const START_NODE: Endpoint = Endpoint {
    name: "start",
    method: HttpMethod::Put,
    path: "/user/update-start-time",
    authorized: true,
    body: start_body,
    success: succeeded,
};

pub const KEEP_ALIVE: Endpoint = Endpoint {
    name: "keep-alive",
    method: HttpMethod::Put,
    path: "/user/update-start-time",
    authorized: true,
    body: keep_alive_body,
    success: succeeded,
};

pub const CHECK_IN: Endpoint = Endpoint {
    name: "check-in",
    method: HttpMethod::Post,
    path: "/user/check-in",
    authorized: true,
    body: wallet_body,
    success: checked_in,
};

/// The login route doubles as the status/points query when called with a token.
pub const POINTS: Endpoint = Endpoint {
    name: "points",
    method: HttpMethod::Post,
    path: "/user/login",
    authorized: true,
    body: wallet_body,
    success: succeeded,
};

fn wallet_body(args: &CallArgs<'_>) -> Value {
    json!({ "wallet": args.wallet })
}

fn login_body(args: &CallArgs<'_>) -> Value {
    match (args.message, args.signature) {
        (Some(message), Some(signature)) => json!({
            "wallet": args.wallet,
            "message": message,
            "signature": signature,
        }),
        _ => wallet_body(args),
    }
}

fn start_body(args: &CallArgs<'_>) -> Value {
    let mut body = keep_alive_body(args);
    if let Some(signature) = args.signature {
        body["signature"] = Value::String(signature.to_string());
    }
    body
}

fn keep_alive_body(args: &CallArgs<'_>) -> Value {
    json!({
        "wallet": args.wallet,
        "startTime": args.start_time,
    })
}

fn succeeded(resp: &ApiEnvelope) -> bool {
    resp.success
}

fn has_token(resp: &ApiEnvelope) -> bool {
    resp.success && resp.fresh_token().is_some()
}

fn checked_in(resp: &ApiEnvelope) -> bool {
    resp.success || is_already_checked_in(resp)
}

pub fn is_already_checked_in(resp: &ApiEnvelope) -> bool {
    resp.reason()
        .map(|r| r.to_lowercase().contains("already checked in"))
        .unwrap_or(false)
}
