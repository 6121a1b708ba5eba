// Schema-aware annotation pass over a request body.
//
// Full re-scan on every call: comments are blanked, the body is parsed, and
// every string member whose path is an enum or well-known field is anchored
// just past the closing quote of its value. Parse failures yield nothing, and
// so does a body where some object repeats a key.

use std::collections::HashMap;

use rpcdesk_common::jsonc::{has_duplicate_keys, scan_string_members, strip_comments, StringMember};
use rpcdesk_common::schema::{SchemaIndex, WellKnownKind};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Enum,
    Timestamp,
    Duration,
}

impl From<WellKnownKind> for WidgetKind {
    fn from(kind: WellKnownKind) -> Self {
        match kind {
            WellKnownKind::Timestamp => Self::Timestamp,
            WellKnownKind::Duration => Self::Duration,
        }
    }
}

/// Request to place a widget of `kind` at byte `offset` of the buffer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
pub struct Annotation {
    pub offset: usize,
    pub kind: WidgetKind,
    pub field_path: String,
}

struct Leaf<'v> {
    path: String,
    key: &'v str,
    value: &'v str,
}

/// Compute the annotations for `text`, ordered by offset.
pub fn annotate(text: &str, index: &SchemaIndex) -> Vec<Annotation> {
    if index.is_empty() {
        return Vec::new();
    }

    let stripped = strip_comments(text);
    let Ok(root) = serde_json::from_str::<Value>(&stripped) else {
        return Vec::new();
    };
    if has_duplicate_keys(&stripped) {
        return Vec::new();
    }

    let mut leaves = Vec::new();
    collect_leaves(&root, "", &mut leaves);

    let mut occurrences: HashMap<(&str, &str), Vec<&StringMember>> = HashMap::new();
    let members = scan_string_members(&stripped);
    for member in &members {
        occurrences.entry((member.key.as_str(), member.value.as_str())).or_default().push(member);
    }
    let mut consumed: HashMap<(&str, &str), usize> = HashMap::new();

    let mut annotations = Vec::new();
    for leaf in &leaves {
        let slot = consumed.entry((leaf.key, leaf.value)).or_insert(0);
        let member = occurrences.get(&(leaf.key, leaf.value)).and_then(|found| found.get(*slot));
        *slot += 1;

        let Some(entry) = index.get(&leaf.path) else {
            continue;
        };
        let kind = if entry.is_enum() {
            WidgetKind::Enum
        } else if let Some(well_known) = entry.well_known_kind {
            WidgetKind::from(well_known)
        } else {
            continue;
        };
        let Some(member) = member else {
            continue;
        };

        annotations.push(Annotation { offset: member.value_end, kind, field_path: leaf.path.clone() });
    }

    annotations.sort_by_key(|annotation| annotation.offset);
    annotations
}

// Every object member with a string value, in document order. Array elements
// share the path of the array field.
fn collect_leaves<'v>(value: &'v Value, path: &str, leaves: &mut Vec<Leaf<'v>>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
                if let Value::String(text) = child {
                    leaves.push(Leaf { path: child_path, key: key.as_str(), value: text.as_str() });
                } else {
                    collect_leaves(child, &child_path, leaves);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_leaves(item, path, leaves);
            }
        }
        _ => {}
    }
}
