// Flattened view of a message tree keyed by dotted field path.
//
// Built once per selected method. Insertion order is depth-first with every
// parent field ahead of the fields it contains.

use indexmap::IndexMap;

use super::{EnumValueInfo, FieldInfo, MessageInfo, WellKnownKind};

/// Nesting depth past which the walk stops descending.
pub const MAX_SCHEMA_DEPTH: usize = 32;

/// Metadata for one field, addressed by its root-relative dotted path.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub name: String,
    pub path: String,
    pub type_name: String,
    pub repeated: bool,
    pub is_map: bool,
    /// Non-empty exactly when the field is an enum.
    pub enum_values: Vec<EnumValueInfo>,
    pub well_known_kind: Option<WellKnownKind>,
    pub nested_message: Option<MessageInfo>,
}

impl FieldEntry {
    pub fn is_enum(&self) -> bool {
        !self.enum_values.is_empty()
    }

    pub fn is_well_known(&self) -> bool {
        self.well_known_kind.is_some()
    }

    /// Short type description used by completion, e.g. `pkg.Status[] (enum)`.
    pub fn type_detail(&self) -> String {
        let mut detail = self.type_name.clone();
        if self.repeated {
            detail.push_str("[]");
        }
        if self.is_enum() {
            detail.push_str(" (enum)");
        }
        detail
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaIndex {
    fields: IndexMap<String, FieldEntry>,
}

impl SchemaIndex {
    /// Flatten `root`. A missing root yields an empty index.
    pub fn build(root: Option<&MessageInfo>) -> Self {
        let mut index = Self::default();
        if let Some(root) = root {
            let mut ancestors = vec![root.name.as_str()];
            index.walk("", root, &mut ancestors);
        }
        index
    }

    fn walk<'a>(&mut self, prefix: &str, message: &'a MessageInfo, ancestors: &mut Vec<&'a str>) {
        for field in &message.fields {
            if field.name.is_empty() {
                continue;
            }

            let path =
                if prefix.is_empty() { field.name.clone() } else { format!("{prefix}.{}", field.name) };
            if self.fields.contains_key(&path) {
                continue;
            }

            let entry = entry_for(field, &path);
            let descend = entry.well_known_kind.is_none();
            self.fields.insert(path.clone(), entry);

            let Some(nested) = field.message.as_deref() else {
                continue;
            };
            if !descend || ancestors.len() >= MAX_SCHEMA_DEPTH {
                continue;
            }
            if !nested.name.is_empty() && ancestors.contains(&nested.name.as_str()) {
                continue;
            }

            ancestors.push(nested.name.as_str());
            self.walk(&path, nested, ancestors);
            ancestors.pop();
        }
    }

    pub fn get(&self, path: &str) -> Option<&FieldEntry> {
        self.fields.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldEntry)> {
        self.fields.iter().map(|(path, entry)| (path.as_str(), entry))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First enum field (in index order) whose leaf name is `name`.
    pub fn enum_by_leaf(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.values().find(|entry| entry.name == name && entry.is_enum())
    }
}

fn entry_for(field: &FieldInfo, path: &str) -> FieldEntry {
    let well_known_kind = if field.has_enum_values() { None } else { field.well_known_kind() };
    FieldEntry {
        name: field.name.clone(),
        path: path.to_string(),
        type_name: field.type_name.clone(),
        repeated: field.repeated,
        is_map: field.is_map,
        enum_values: field.enum_values.clone(),
        well_known_kind,
        nested_message: field.message.as_deref().cloned(),
    }
}
