use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Response wrapper shared by every endpoint.
///
/// Only `success` and `token` decide the outcome of a call, so every other
/// field is read leniently: an unexpected JSON type becomes `None` instead
/// of failing the whole response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub token: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub points: Option<f64>,
    /// Raw `user` record; decoded on demand by [`ApiEnvelope::node_status`].
    #[serde(default)]
    pub user: Option<Value>,
}

impl ApiEnvelope {
    /// Human-readable reason attached to the response, if any.
    pub fn reason(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// A rotated bearer token, ignoring empty strings.
    pub fn fresh_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    /// The `user` record, or `None` when absent or not an object.
    pub fn node_status(&self) -> Option<NodeStatus> {
        match &self.user {
            Some(user @ Value::Object(_)) => NodeStatus::deserialize(user).ok(),
            _ => None,
        }
    }

    /// Point total, preferring the top-level `points` field over the user record.
    pub fn total_points(&self) -> Option<f64> {
        self.points
            .or_else(|| self.node_status().and_then(|u| u.total_points))
    }
}

/// Node record as reported under `user`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeStatus {
    #[serde(rename = "nodeUptime", default, deserialize_with = "lenient_f64")]
    pub node_uptime: Option<f64>,
    #[serde(rename = "totalPoints", default, deserialize_with = "lenient_f64")]
    pub total_points: Option<f64>,
    #[serde(rename = "activeDays", default, deserialize_with = "lenient_i64")]
    pub active_days: Option<i64>,
    #[serde(rename = "lastCheckInDate", default, deserialize_with = "lenient_string")]
    pub last_check_in_date: Option<String>,
    #[serde(rename = "nextTotalPoints", default, deserialize_with = "lenient_f64")]
    pub next_total_points: Option<f64>,
    /// Epoch milliseconds or an ISO-8601 string, depending on the backend build.
    #[serde(rename = "startTime", default)]
    pub start_time: Option<Value>,
}

impl NodeStatus {
    pub fn is_running(&self) -> bool {
        self.node_uptime.map(|m| m > 0.0).unwrap_or(false)
    }

    pub fn uptime_display(&self) -> String {
        match self.node_uptime {
            Some(minutes) => format!("{} minutes", minutes),
            None => "Unknown".to_string(),
        }
    }

    /// Node start time in local time, from either encoding.
    pub fn started_at(&self) -> Option<DateTime<Local>> {
        match self.start_time.as_ref()? {
            Value::Number(n) => Local.timestamp_millis_opt(n.as_f64()? as i64).single(),
            Value::String(s) => match s.parse::<f64>() {
                Ok(millis) => Local.timestamp_millis_opt(millis as i64).single(),
                Err(_) => DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.with_timezone(&Local)),
            },
            _ => None,
        }
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(lenient_f64(deserializer)?.map(|n| n as i64))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
