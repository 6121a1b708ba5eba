// Example request bodies for a freshly opened method.
//
// Output is JSON-with-comments: every real `oneof` group is announced with a
// `// oneof <group> (choose one):` line ahead of its first member.

use std::collections::HashSet;

use super::{FieldInfo, MessageInfo, WellKnownKind, MAX_SCHEMA_DEPTH};

const INDENT: &str = "  ";
const TIMESTAMP_EXAMPLE: &str = "1970-01-01T00:00:00Z";
const DURATION_EXAMPLE: &str = "0s";

const NUMERIC_TYPES: &[&str] = &[
    "int32", "sint32", "sfixed32", "int64", "sint64", "sfixed64", "uint32", "fixed32", "uint64",
    "fixed64", "float", "double",
];

/// Render an example body for `message`; `None` renders `{}`.
pub fn generate_example(message: Option<&MessageInfo>) -> String {
    let Some(message) = message else {
        return "{}".to_string();
    };
    let mut out = String::new();
    let mut ancestors = vec![message.name.as_str()];
    write_message(&mut out, message, 0, &mut ancestors);
    out
}

fn write_message<'a>(
    out: &mut String,
    message: &'a MessageInfo,
    level: usize,
    ancestors: &mut Vec<&'a str>,
) {
    if message.fields.is_empty() {
        out.push_str("{}");
        return;
    }

    out.push_str("{\n");
    let mut announced: HashSet<&str> = HashSet::new();
    let inner = INDENT.repeat(level + 1);

    for (position, field) in message.fields.iter().enumerate() {
        let group = field.oneof_group.as_str();
        if !group.is_empty() && !group.starts_with('_') && announced.insert(group) {
            out.push_str(&format!("{inner}// oneof {group} (choose one):\n"));
        }

        out.push_str(&inner);
        out.push_str(&quote(&field.name));
        out.push_str(": ");
        write_field_value(out, field, level + 1, ancestors);
        if position + 1 < message.fields.len() {
            out.push(',');
        }
        out.push('\n');
    }

    out.push_str(&INDENT.repeat(level));
    out.push('}');
}

fn write_field_value<'a>(
    out: &mut String,
    field: &'a FieldInfo,
    level: usize,
    ancestors: &mut Vec<&'a str>,
) {
    if field.is_map {
        out.push_str("{}");
        return;
    }

    if !field.repeated {
        write_single_value(out, field, level, ancestors);
        return;
    }

    let inner = INDENT.repeat(level + 1);
    out.push_str("[\n");
    out.push_str(&inner);
    write_single_value(out, field, level + 1, ancestors);
    out.push('\n');
    out.push_str(&INDENT.repeat(level));
    out.push(']');
}

fn write_single_value<'a>(
    out: &mut String,
    field: &'a FieldInfo,
    level: usize,
    ancestors: &mut Vec<&'a str>,
) {
    if let Some(first) = field.enum_values.first() {
        out.push_str(&quote(&first.name));
        return;
    }

    if let Some(kind) = field.well_known_kind() {
        let example = match kind {
            WellKnownKind::Timestamp => TIMESTAMP_EXAMPLE,
            WellKnownKind::Duration => DURATION_EXAMPLE,
        };
        out.push_str(&quote(example));
        return;
    }

    if let Some(nested) = field.message.as_deref() {
        let cyclic = !nested.name.is_empty() && ancestors.contains(&nested.name.as_str());
        if cyclic || ancestors.len() >= MAX_SCHEMA_DEPTH {
            out.push_str("{}");
            return;
        }
        ancestors.push(nested.name.as_str());
        write_message(out, nested, level, ancestors);
        ancestors.pop();
        return;
    }

    let scalar = match field.type_name.as_str() {
        "bool" => "false",
        "string" | "bytes" => "\"\"",
        "enum" => "0",
        other if NUMERIC_TYPES.contains(&other) => "0",
        _ => "null",
    };
    out.push_str(scalar);
}

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::jsonc;

    fn parse(example: &str) -> Value {
        serde_json::from_str(&jsonc::strip_comments(example)).expect("example should be valid JSONC")
    }

    #[test]
    fn simple_request_uses_zero_values() {
        let message = MessageInfo::new(
            "testserver.SimpleRequest",
            vec![FieldInfo::new("message", "string"), FieldInfo::new("value", "int32")],
        );
        let value = parse(&generate_example(Some(&message)));
        assert_eq!(value["message"], "");
        assert_eq!(value["value"], 0);
    }

    #[test]
    fn complex_request_nests_repeats_and_picks_first_enum() {
        let address = MessageInfo::new(
            "testserver.Address",
            vec![FieldInfo::new("street", "string"), FieldInfo::new("zip_code", "int32")],
        );
        let user = MessageInfo::new(
            "testserver.User",
            vec![
                FieldInfo::new("name", "string"),
                FieldInfo::new("active", "bool"),
                FieldInfo::new("address", "testserver.Address").with_message(address),
            ],
        );
        let message = MessageInfo::new(
            "testserver.ComplexRequest",
            vec![
                FieldInfo::new("user", "testserver.User").with_message(user.clone()),
                FieldInfo::new("users", "testserver.User").with_message(user).repeated(),
                FieldInfo::new("status", "testserver.Status").with_enum(&[
                    ("UNKNOWN", 0),
                    ("PENDING", 1),
                ]),
                FieldInfo::new("timestamps", "int64").repeated(),
            ],
        );

        let value = parse(&generate_example(Some(&message)));
        assert_eq!(value["user"]["active"], false);
        assert_eq!(value["user"]["address"]["street"], "");
        assert_eq!(value["users"].as_array().unwrap().len(), 1);
        assert_eq!(value["status"], "UNKNOWN");
        assert_eq!(value["timestamps"], serde_json::json!([0]));
    }

    #[test]
    fn maps_render_as_empty_objects() {
        let mut map = FieldInfo::new("metadata", "map<string, string>");
        map.is_map = true;
        let value = parse(&generate_example(Some(&MessageInfo::new("R", vec![map]))));
        assert_eq!(value["metadata"], serde_json::json!({}));
    }

    #[test]
    fn empty_and_missing_messages_render_empty_object() {
        assert_eq!(generate_example(None), "{}");
        assert_eq!(generate_example(Some(&MessageInfo::new("Empty", vec![]))), "{}");
    }

    #[test]
    fn well_known_types_render_as_strings() {
        let message = MessageInfo::new(
            "R",
            vec![
                FieldInfo::new("at", "google.protobuf.Timestamp"),
                FieldInfo::new("ttl", "google.protobuf.Duration"),
            ],
        );
        let value = parse(&generate_example(Some(&message)));
        assert_eq!(value["at"], TIMESTAMP_EXAMPLE);
        assert_eq!(value["ttl"], DURATION_EXAMPLE);
    }

    #[test]
    fn oneof_groups_get_a_single_comment_each() {
        let message = MessageInfo::new(
            "MultiOneof",
            vec![
                FieldInfo::new("regular", "string"),
                FieldInfo::new("field1", "string").in_oneof("group1"),
                FieldInfo::new("field2", "string").in_oneof("group1"),
                FieldInfo::new("field3", "int32").in_oneof("group2"),
            ],
        );
        let example = generate_example(Some(&message));
        assert_eq!(example.matches("// oneof group1 (choose one):").count(), 1);
        assert_eq!(example.matches("// oneof group2 (choose one):").count(), 1);
        assert!(example.contains(r#""field1": """#));
        assert!(example.contains(r#""field3": 0"#));
        parse(&example);
    }

    #[test]
    fn proto3_optional_groups_are_not_announced() {
        let message = MessageInfo::new(
            "R",
            vec![
                FieldInfo::new("message_id", "int64").in_oneof("_message_id"),
                FieldInfo::new("limit", "uint32").in_oneof("_limit"),
            ],
        );
        let example = generate_example(Some(&message));
        assert!(!example.contains("// oneof"));
        assert!(example.contains(r#""message_id": 0"#));
    }

    #[test]
    fn self_referential_messages_terminate() {
        let inner = MessageInfo::new("pkg.Node", vec![FieldInfo::new("value", "string")]);
        let node = MessageInfo::new(
            "pkg.Node",
            vec![FieldInfo::new("parent", "pkg.Node").with_message(inner)],
        );
        let value = parse(&generate_example(Some(&node)));
        assert_eq!(value["parent"], serde_json::json!({}));
    }
}
