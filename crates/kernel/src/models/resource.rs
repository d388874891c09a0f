//! Resource model.
//!
//! Resources are the nodes of the content tree (pages in most hosts). Each
//! one has a stable integer id, a unique hierarchical path, a template name
//! and a bag of custom field values. Named metadata slots belong to the
//! resource too, but they live in the store rather than on this struct.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One projected result row: field name to raw value, in projection order.
pub type RawRecord = Map<String, Value>;

/// A node of the content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Stable identifier.
    pub id: i64,

    /// Parent resource id (`None` for the root).
    #[serde(default)]
    pub parent_id: Option<i64>,

    /// Last path segment. Derived from the path when empty.
    #[serde(default)]
    pub name: String,

    /// Hierarchical path as stored (e.g. `/blog/post-1/`).
    pub path: String,

    /// Template (content type) name.
    #[serde(default)]
    pub template: String,

    /// Number of direct children. Maintained by the store.
    #[serde(default)]
    pub num_children: i64,

    /// Unix timestamp when created.
    #[serde(default)]
    pub created: i64,

    /// Unix timestamp when last modified.
    #[serde(default)]
    pub modified: i64,

    /// Custom field values.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Resource {
    /// Create a resource with the given id and path; the name is derived
    /// from the last path segment.
    pub fn new(id: i64, path: impl Into<String>) -> Self {
        let path = path.into();
        let name = name_from_path(&path);
        Self {
            id,
            parent_id: None,
            name,
            path,
            template: String::new(),
            num_children: 0,
            created: 0,
            modified: 0,
            fields: Map::new(),
        }
    }

    /// Set a custom field value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set the template name.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Path in normalized form, suitable for comparisons.
    pub fn normalized_path(&self) -> String {
        normalize_path(&self.path)
    }

    /// Resolve a field by name: built-in attributes first, then custom fields.
    ///
    /// Returns `None` when the resource carries no value for the field.
    pub fn field_value(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::from(self.id)),
            "parent_id" | "parent" => self.parent_id.map(Value::from),
            "name" => Some(Value::from(self.name.clone())),
            "path" => Some(Value::from(self.path.clone())),
            "template" => Some(Value::from(self.template.clone())),
            "num_children" => Some(Value::from(self.num_children)),
            "created" => Some(Value::from(self.created)),
            "modified" => Some(Value::from(self.modified)),
            _ => lookup_custom(&self.fields, name),
        }
    }

    /// Project this resource onto exactly the given fields, in order.
    ///
    /// Fields the resource does not carry are present with a `null` value.
    pub fn project(&self, fields: &[String]) -> RawRecord {
        let mut record = RawRecord::new();
        for field in fields {
            let value = self.field_value(field).unwrap_or(Value::Null);
            record.insert(field.clone(), value);
        }
        record
    }
}

/// Look up a custom field, following dotted paths into nested objects.
fn lookup_custom(fields: &Map<String, Value>, name: &str) -> Option<Value> {
    if let Some(value) = fields.get(name) {
        return Some(value.clone());
    }

    let mut parts = name.split('.');
    let mut current = fields.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current.clone())
}

/// Normalize a resource path: leading slash, no trailing slash except for
/// the root, surrounding whitespace removed.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Normalized path of the parent, or `None` for the root.
pub fn parent_path(path: &str) -> Option<String> {
    let normalized = normalize_path(path);
    if normalized == "/" {
        return None;
    }
    match normalized.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(normalized[..idx].to_string()),
        None => None,
    }
}

fn name_from_path(path: &str) -> String {
    normalize_path(path)
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
