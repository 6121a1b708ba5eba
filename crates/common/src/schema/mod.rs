// Reflection schema model: services, methods and message trees as reported by
// the reflection collaborator, plus the flattened index and example generator.

pub mod example;
pub mod index;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub use example::generate_example;
pub use index::{FieldEntry, SchemaIndex, MAX_SCHEMA_DEPTH};

/// Fully qualified name of the protobuf timestamp message.
pub const TIMESTAMP_TYPE: &str = "google.protobuf.Timestamp";
/// Fully qualified name of the protobuf duration message.
pub const DURATION_TYPE: &str = "google.protobuf.Duration";

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Well-known scalar representations that get a dedicated editing widget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WellKnownKind {
    Timestamp,
    Duration,
}

impl WellKnownKind {
    /// Infer the kind from a fully qualified message type name.
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        match type_name.trim_start_matches('.') {
            TIMESTAMP_TYPE => Some(Self::Timestamp),
            DURATION_TYPE => Some(Self::Duration),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Duration => "duration",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnumValueInfo {
    pub name: String,
    pub number: i32,
}

/// One field of a message as described by reflection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub number: i32,
    pub repeated: bool,
    pub optional: bool,
    pub is_map: bool,
    pub map_key: String,
    pub map_value: String,
    /// Name of the containing `oneof`; proto3 optional fields use a synthetic
    /// group whose name starts with `_`.
    pub oneof_group: String,
    pub is_enum: bool,
    pub enum_values: Vec<EnumValueInfo>,
    pub is_well_known: bool,
    #[serde(deserialize_with = "deserialize_well_known")]
    pub well_known_type: Option<WellKnownKind>,
    pub message: Option<Box<MessageInfo>>,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self { name: name.into(), type_name: type_name.into(), ..Self::default() }
    }

    pub fn with_enum(mut self, values: &[(&str, i32)]) -> Self {
        self.is_enum = true;
        self.enum_values = values
            .iter()
            .map(|(name, number)| EnumValueInfo { name: (*name).to_string(), number: *number })
            .collect();
        self
    }

    pub fn with_message(mut self, message: MessageInfo) -> Self {
        self.well_known_type = WellKnownKind::from_type_name(&message.name);
        self.is_well_known = self.well_known_type.is_some();
        self.message = Some(Box::new(message));
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    pub fn in_oneof(mut self, group: impl Into<String>) -> Self {
        self.oneof_group = group.into();
        self
    }

    /// Enum-ness as the rest of the system sees it: a member list must exist.
    pub fn has_enum_values(&self) -> bool {
        !self.enum_values.is_empty()
    }

    /// Resolve the well-known kind from the explicit flag or the type name.
    pub fn well_known_kind(&self) -> Option<WellKnownKind> {
        self.well_known_type
            .or_else(|| WellKnownKind::from_type_name(&self.type_name))
            .or_else(|| self.message.as_ref().and_then(|m| WellKnownKind::from_type_name(&m.name)))
    }
}

/// A message type: a name and its ordered fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageInfo {
    pub name: String,
    pub fields: Vec<FieldInfo>,
}

impl MessageInfo {
    pub fn new(name: impl Into<String>, fields: Vec<FieldInfo>) -> Self {
        Self { name: name.into(), fields }
    }

    /// Parse a message description from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MethodInfo {
    pub name: String,
    pub request_type: String,
    pub response_type: String,
    pub request: Option<MessageInfo>,
    pub response: Option<MessageInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceInfo {
    pub name: String,
    pub methods: Vec<MethodInfo>,
}

impl ServiceInfo {
    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|method| method.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ServicesInfo {
    pub services: Vec<ServiceInfo>,
}

impl ServicesInfo {
    pub fn find_method(&self, service: &str, method: &str) -> Option<&MethodInfo> {
        self.services.iter().find(|s| s.name == service).and_then(|s| s.method(method))
    }
}

// The reflection collaborator sends `""` when a field is not well-known.
fn deserialize_well_known<'de, D>(deserializer: D) -> Result<Option<WellKnownKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        Some("timestamp") => Some(WellKnownKind::Timestamp),
        Some("duration") => Some(WellKnownKind::Duration),
        _ => None,
    })
}
