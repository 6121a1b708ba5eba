// Per-tab request/response workspace.
//
// Serialized as the `state` column of a tab record. Decoding tolerates schema
// drift: missing fields default, unknown fields are ignored.

use rpcdesk_common::types::HistoryRecord;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Subview {
    #[default]
    Body,
    Metadata,
    Context,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeyValuePair {
    pub id: String,
    pub key: String,
    pub value: String,
}

impl Default for KeyValuePair {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4().to_string(), key: key.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestWorkspace {
    pub server_id: i64,
    pub service_name: String,
    pub method_name: String,
    pub source_history_id: Option<i64>,
    pub active_subview: Subview,
    pub request_body_text: String,
    pub metadata_pairs: Vec<KeyValuePair>,
    pub context_pairs: Vec<KeyValuePair>,
    pub response_text: String,
    pub response_time_ms: i64,
}

impl RequestWorkspace {
    /// Fresh workspace for a method, seeded with an example body.
    pub fn for_method(
        server_id: i64,
        service: impl Into<String>,
        method: impl Into<String>,
        example_body: impl Into<String>,
    ) -> Self {
        Self {
            server_id,
            service_name: service.into(),
            method_name: method.into(),
            request_body_text: example_body.into(),
            ..Self::default()
        }
    }

    /// Workspace restored from a past invocation.
    pub fn from_history(record: &HistoryRecord) -> Self {
        let to_pairs = |pairs: Vec<(String, String)>| -> Vec<KeyValuePair> {
            pairs.into_iter().map(|(key, value)| KeyValuePair::new(key, value)).collect()
        };
        let response = match &record.error {
            Some(error) if record.response.is_empty() => error.clone(),
            _ => record.response.clone(),
        };
        Self {
            server_id: record.server_id,
            service_name: record.service.clone(),
            method_name: record.method.clone(),
            source_history_id: Some(record.id),
            active_subview: Subview::Body,
            request_body_text: record.request.clone(),
            metadata_pairs: to_pairs(record.request_header_pairs()),
            context_pairs: to_pairs(record.context_value_pairs()),
            response_text: response,
            response_time_ms: record.execution_time_ms,
        }
    }

    pub fn to_state(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Decode a stored payload; undecodable payloads become an empty workspace.
    pub fn from_state(state: &str) -> Self {
        match serde_json::from_str(state) {
            Ok(workspace) => workspace,
            Err(error) => {
                warn!(error = %error, "discarding undecodable workspace state");
                Self::default()
            }
        }
    }

    /// Metadata entries with a non-empty key, in display order.
    pub fn metadata(&self) -> Vec<(String, String)> {
        non_empty_pairs(&self.metadata_pairs)
    }

    pub fn context_values(&self) -> Vec<(String, String)> {
        non_empty_pairs(&self.context_pairs)
    }
}

fn non_empty_pairs(pairs: &[KeyValuePair]) -> Vec<(String, String)> {
    pairs
        .iter()
        .filter(|pair| !pair.key.trim().is_empty())
        .map(|pair| (pair.key.clone(), pair.value.clone()))
        .collect()
}

/// Shallow update of a workspace; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspacePatch {
    pub active_subview: Option<Subview>,
    pub request_body_text: Option<String>,
    pub metadata_pairs: Option<Vec<KeyValuePair>>,
    pub context_pairs: Option<Vec<KeyValuePair>>,
    pub response_text: Option<String>,
    pub response_time_ms: Option<i64>,
}

impl WorkspacePatch {
    pub fn body(text: impl Into<String>) -> Self {
        Self { request_body_text: Some(text.into()), ..Self::default() }
    }

    pub fn response(text: impl Into<String>, elapsed_ms: i64) -> Self {
        Self { response_text: Some(text.into()), response_time_ms: Some(elapsed_ms), ..Self::default() }
    }

    pub fn apply(self, workspace: &mut RequestWorkspace) {
        if let Some(subview) = self.active_subview {
            workspace.active_subview = subview;
        }
        if let Some(body) = self.request_body_text {
            workspace.request_body_text = body;
        }
        if let Some(pairs) = self.metadata_pairs {
            workspace.metadata_pairs = pairs;
        }
        if let Some(pairs) = self.context_pairs {
            workspace.context_pairs = pairs;
        }
        if let Some(text) = self.response_text {
            workspace.response_text = text;
        }
        if let Some(elapsed) = self.response_time_ms {
            workspace.response_time_ms = elapsed;
        }
    }
}
