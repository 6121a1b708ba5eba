// Completion candidates for the request body editor.

use std::sync::OnceLock;

use regex::Regex;
use rpcdesk_common::schema::SchemaIndex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    EnumMember,
    Property,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    pub detail: String,
}

/// Candidates replacing the text from `from` up to the cursor.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CompletionList {
    pub from: usize,
    pub items: Vec<CompletionItem>,
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionContext<'a> {
    pub text: &'a str,
    /// Byte offset of the cursor.
    pub cursor: usize,
    /// Requested explicitly (e.g. Ctrl+Space) rather than while typing.
    pub explicit: bool,
}

/// `None` means "no completion"; a returned list is never empty.
pub fn complete(
    index: Option<&SchemaIndex>,
    read_only: bool,
    context: CompletionContext<'_>,
) -> Option<CompletionList> {
    let index = index.filter(|index| !index.is_empty())?;
    if read_only || context.cursor > context.text.len() || !context.text.is_char_boundary(context.cursor) {
        return None;
    }

    let before = &context.text[..context.cursor];
    let from = word_start(before);
    if from == context.cursor && !context.explicit {
        return None;
    }

    // A value position offers enum members or nothing.
    let items: Vec<CompletionItem> = match value_key(before) {
        Some(key) => index
            .enum_by_leaf(key)
            .map(|entry| {
                entry
                    .enum_values
                    .iter()
                    .map(|value| CompletionItem {
                        label: value.name.clone(),
                        kind: CompletionKind::EnumMember,
                        detail: format!("enum ({})", value.number),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        None => index
            .iter()
            .map(|(_, entry)| CompletionItem {
                label: entry.name.clone(),
                kind: CompletionKind::Property,
                detail: entry.type_detail(),
            })
            .collect(),
    };

    if items.is_empty() {
        return None;
    }
    Some(CompletionList { from, items })
}

// Start of the `\w*` run that ends at the cursor.
fn word_start(before: &str) -> usize {
    before
        .char_indices()
        .rev()
        .take_while(|(_, ch)| ch.is_alphanumeric() || *ch == '_')
        .last()
        .map_or(before.len(), |(offset, _)| offset)
}

// Key whose value is being typed, when the cursor sits in value position.
fn value_key(before: &str) -> Option<&str> {
    static VALUE_POSITION: OnceLock<Regex> = OnceLock::new();
    let re = VALUE_POSITION.get_or_init(|| {
        Regex::new(r#""(\w+)"\s*:\s*"?[^"]*$"#).expect("value position pattern should compile")
    });
    re.captures(before).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rpcdesk_common::schema::{FieldInfo, MessageInfo};

    use super::*;

    fn index() -> SchemaIndex {
        let sort = MessageInfo::new(
            "pkg.Sort",
            vec![FieldInfo::new("order", "pkg.Order").with_enum(&[("ASC", 1), ("DESC", 2)])],
        );
        SchemaIndex::build(Some(&MessageInfo::new(
            "pkg.Request",
            vec![
                FieldInfo::new("status", "pkg.Status").with_enum(&[("OK", 0), ("FAIL", 1)]),
                FieldInfo::new("tags", "string").repeated(),
                FieldInfo::new("sort", "pkg.Sort").with_message(sort),
            ],
        )))
    }

    fn typed(text: &str) -> CompletionContext<'_> {
        CompletionContext { text, cursor: text.len(), explicit: false }
    }

    fn labels(list: &CompletionList) -> Vec<&str> {
        list.items.iter().map(|item| item.label.as_str()).collect()
    }

    #[test]
    fn enum_members_offered_in_value_position() {
        let index = index();
        let list = complete(Some(&index), false, typed(r#"{"status": "O"#)).unwrap();
        assert_eq!(labels(&list), vec!["OK", "FAIL"]);
        assert_eq!(list.items[1].detail, "enum (1)");
        assert_eq!(list.items[0].kind, CompletionKind::EnumMember);
        assert_eq!(list.from, r#"{"status": ""#.len());
    }

    #[test]
    fn nested_enum_resolved_by_leaf_name() {
        let index = index();
        let list = complete(Some(&index), false, typed(r#"{"sort": {"order": "D"#)).unwrap();
        assert_eq!(labels(&list), vec!["ASC", "DESC"]);
    }

    #[test]
    fn field_names_offered_elsewhere_with_type_details() {
        let index = index();
        let list = complete(Some(&index), false, typed("{\n  st")).unwrap();
        assert_eq!(labels(&list), vec!["status", "tags", "sort", "order"]);
        assert_eq!(list.items[0].detail, "pkg.Status (enum)");
        assert_eq!(list.items[1].detail, "string[]");
        assert_eq!(list.from, "{\n  ".len());
    }

    #[test]
    fn non_enum_key_in_value_position_offers_nothing() {
        let index = index();
        assert!(complete(Some(&index), false, typed(r#"{"tags": "x"#)).is_none());
        assert!(complete(Some(&index), false, typed(r#"{"unknown": "bo"#)).is_none());
    }

    #[test]
    fn closed_value_is_not_value_position() {
        let index = index();
        let list = complete(Some(&index), false, typed(r#"{"status": "OK", s"#)).unwrap();
        assert!(labels(&list).contains(&"status"));
    }

    #[test]
    fn no_completion_without_schema_or_when_read_only() {
        let index = index();
        assert!(complete(None, false, typed("{ s")).is_none());
        assert!(complete(Some(&SchemaIndex::default()), false, typed("{ s")).is_none());
        assert!(complete(Some(&index), true, typed("{ s")).is_none());
    }

    #[test]
    fn empty_word_needs_explicit_request() {
        let index = index();
        assert!(complete(Some(&index), false, typed("{ ")).is_none());
        let explicit = CompletionContext { text: "{ ", cursor: 2, explicit: true };
        let list = complete(Some(&index), false, explicit).unwrap();
        assert_eq!(list.from, 2);
    }

    #[test]
    fn cursor_inside_multibyte_char_is_rejected() {
        let index = index();
        let text = "{\"é";
        let context = CompletionContext { text, cursor: text.len() - 1, explicit: true };
        assert!(complete(Some(&index), false, context).is_none());
    }

    #[test]
    fn explicit_request_in_scalar_value_is_empty() {
        let index = SchemaIndex::build(Some(&MessageInfo::new("R", vec![FieldInfo::new("n", "int32")])));
        let context = CompletionContext { text: "{\"n\": \"", cursor: 7, explicit: true };
        assert!(complete(Some(&index), false, context).is_none());
    }

    proptest! {
        #[test]
        fn arbitrary_cursors_yield_a_bounded_start(
            text in "[{}\\[\\]\":,/*\\\\ \nstatuOKé0-9a]{0,60}",
            cursor in 0usize..80,
            explicit in any::<bool>(),
        ) {
            let index = index();
            let context = CompletionContext { text: &text, cursor, explicit };
            if let Some(list) = complete(Some(&index), false, context) {
                prop_assert!(cursor <= text.len());
                prop_assert!(list.from <= cursor);
                prop_assert!(text.is_char_boundary(list.from));
                prop_assert!(!list.items.is_empty());
            }
        }
    }
}
