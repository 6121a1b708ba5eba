// Record types exchanged with the storage and server collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::ServicesInfo;

/// Durable layout of one open tab.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TabStateRecord {
    pub tab_id: String,
    pub name: String,
    /// Tag of the tab component, e.g. `"request"`.
    pub component: String,
    /// Serialized workspace payload (JSON).
    pub state: String,
    pub is_active: bool,
    pub order: i64,
}

/// A registered server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Server {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub use_tls: bool,
    pub insecure: bool,
    pub favorite: bool,
}

/// A server plus whatever its reflection service reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerWithReflection {
    pub server: Server,
    pub reflection: ServicesInfo,
    pub error: Option<String>,
}

/// One past invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: i64,
    pub server_id: i64,
    pub service: String,
    pub method: String,
    pub request: String,
    pub response: String,
    /// JSON object of request metadata; empty when none was sent.
    #[serde(default)]
    pub request_headers: String,
    /// JSON object of context values; empty when none was sent.
    #[serde(default)]
    pub context_values: String,
    #[serde(default)]
    pub status_code: i32,
    #[serde(default)]
    pub execution_time_ms: i64,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn request_header_pairs(&self) -> Vec<(String, String)> {
        string_pairs(&self.request_headers)
    }

    pub fn context_value_pairs(&self) -> Vec<(String, String)> {
        string_pairs(&self.context_values)
    }
}

/// Decode a stored JSON object of strings, keeping key order. Anything else
/// decodes to no pairs.
pub fn string_pairs(json: &str) -> Vec<(String, String)> {
    if json.trim().is_empty() {
        return Vec::new();
    }
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(json) else {
        return Vec::new();
    };
    map.into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::String(value) => Some((key, value)),
            _ => None,
        })
        .collect()
}

/// Outcome class of a server address check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(into = "u8", try_from = "u8")]
pub enum ValidationStatus {
    Success,
    ConnectionFailed,
    ReflectionNotAvailable,
    NoServices,
}

impl From<ValidationStatus> for u8 {
    fn from(status: ValidationStatus) -> Self {
        match status {
            ValidationStatus::Success => 0,
            ValidationStatus::ConnectionFailed => 1,
            ValidationStatus::ReflectionNotAvailable => 2,
            ValidationStatus::NoServices => 3,
        }
    }
}

impl TryFrom<u8> for ValidationStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Success),
            1 => Ok(Self::ConnectionFailed),
            2 => Ok(Self::ReflectionNotAvailable),
            3 => Ok(Self::NoServices),
            other => Err(format!("unknown validation status {other}")),
        }
    }
}

impl ValidationStatus {
    /// Fallback text when the validator sent no message.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Success => "server is reachable",
            Self::ConnectionFailed => "could not connect to the server",
            Self::ReflectionNotAvailable => "server reflection is not available",
            Self::NoServices => "server exposes no services",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self { status: ValidationStatus::Success, message: None }
    }

    pub fn failed(status: ValidationStatus, message: impl Into<String>) -> Self {
        Self { status, message: Some(message.into()) }
    }

    pub fn is_success(&self) -> bool {
        self.status == ValidationStatus::Success
    }

    pub fn message_or_default(&self) -> String {
        self.message.clone().unwrap_or_else(|| self.status.describe().to_string())
    }
}
