//! Per-resource exposure configuration.
//!
//! Each resource carries one configuration record in its `exposure`
//! metadata slot:
//!
//! ```json
//! {"version": 1, "expose": true, "fields": ["id", "title"], "selector": "parent={page}"}
//! ```
//!
//! Loading never fails. Anything unreadable falls back to the zero value
//! field by field, so a record with a good `fields` list and a garbled
//! `expose` flag still keeps its fields.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::models::Resource;
use crate::selector::is_valid_field_name;
use crate::store::{MetadataStore, StoreError};

/// Metadata slot holding the configuration record.
pub const META_KEY: &str = "exposure";

/// Current record layout version.
pub const CONFIG_VERSION: u64 = 1;

/// Prefix of the configuration submission keys
/// (`exposure_expose`, `exposure_fields`, `exposure_selector`).
pub const FORM_PREFIX: &str = "exposure_";

/// Exposure settings of one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExposureConfig {
    /// Whether the resource is served through the public API at all.
    pub expose: bool,

    /// Field whitelist, unique, in output order.
    pub fields: Vec<String>,

    /// Selector template; `{page}` stands for the resource's path.
    pub selector: String,
}

impl ExposureConfig {
    /// Decode a stored record, defaulting whatever is missing or malformed.
    pub fn from_stored(value: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = value else {
            if let Some(other) = value {
                warn!(kind = %json_kind(other), "exposure record is not an object; using defaults");
            }
            return Self::default();
        };

        if let Some(version) = map.get("version").and_then(Value::as_u64)
            && version > CONFIG_VERSION
        {
            warn!(
                version,
                supported = CONFIG_VERSION,
                "exposure record is newer than supported; loading best-effort"
            );
        }

        let expose = match map.get("expose") {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => parse_boolish(s),
            _ => false,
        };

        let fields = match map.get("fields") {
            Some(Value::Array(items)) => {
                normalize_field_list(items.iter().filter_map(Value::as_str))
            }
            Some(Value::String(s)) => split_field_list(s),
            _ => Vec::new(),
        };

        let selector = map
            .get("selector")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            expose,
            fields,
            selector,
        }
    }

    /// Encode as the stored record.
    pub fn to_stored(&self) -> Value {
        json!({
            "version": CONFIG_VERSION,
            "expose": self.expose,
            "fields": self.fields,
            "selector": self.selector,
        })
    }

    /// Field list in its submitted form (`id, title`).
    pub fn fields_text(&self) -> String {
        self.fields.join(", ")
    }
}

/// Raw configuration submission, as typed into the admin form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawExposureInput {
    #[serde(default)]
    pub expose: Option<String>,
    #[serde(default)]
    pub fields: Option<String>,
    #[serde(default)]
    pub selector: Option<String>,
}

impl RawExposureInput {
    /// Pick the prefixed keys out of a submitted form.
    pub fn from_form(form: &HashMap<String, String>) -> Self {
        let get = |name: &str| form.get(&format!("{FORM_PREFIX}{name}")).cloned();
        Self {
            expose: get("expose"),
            fields: get("fields"),
            selector: get("selector"),
        }
    }

    /// Normalize into a configuration. Missing inputs count as empty.
    ///
    /// The selector is kept exactly as submitted.
    pub fn normalize(&self) -> ExposureConfig {
        ExposureConfig {
            expose: self.expose.as_deref().is_some_and(parse_boolish),
            fields: split_field_list(self.fields.as_deref().unwrap_or_default()),
            selector: self.selector.clone().unwrap_or_default(),
        }
    }
}

/// Interpret a checkbox-style string.
///
/// `""`, `"0"`, `"false"`, `"off"` and `"no"` (any case, surrounding
/// whitespace ignored) are false; anything else is true.
pub fn parse_boolish(input: &str) -> bool {
    !matches!(
        input.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "off" | "no"
    )
}

/// Split a comma-separated field list and normalize it.
pub fn split_field_list(input: &str) -> Vec<String> {
    normalize_field_list(input.split(','))
}

/// Strip whitespace from each name, drop empties, and deduplicate keeping
/// the first occurrence.
///
/// Names that could never carry a transformer (see
/// [`is_valid_field_name`]) are dropped with a warning.
pub fn normalize_field_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut fields: Vec<String> = Vec::new();
    for item in items {
        let name: String = item
            .as_ref()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if name.is_empty() || fields.contains(&name) {
            continue;
        }
        if !is_valid_field_name(&name) {
            warn!(field = %name, "dropping invalid field name from whitelist");
            continue;
        }
        fields.push(name);
    }
    fields
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Loads and saves [`ExposureConfig`] through a metadata slot.
#[derive(Clone)]
pub struct ExposureConfigStore {
    metadata: Arc<dyn MetadataStore>,
}

impl ExposureConfigStore {
    /// Create a config store over a metadata capability.
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Load the configuration of `resource`.
    ///
    /// Never fails: a missing slot, a malformed record or a store error all
    /// yield defaults (store errors are logged).
    pub async fn load(&self, resource: &Resource) -> ExposureConfig {
        match self.metadata.meta(resource.id, META_KEY).await {
            Ok(stored) => ExposureConfig::from_stored(stored.as_ref()),
            Err(e) => {
                warn!(resource = resource.id, error = %e, "failed to read exposure config; using defaults");
                ExposureConfig::default()
            }
        }
    }

    /// Normalize `input` and store it as the configuration of `resource`,
    /// replacing the previous record in one write.
    pub async fn save(
        &self,
        resource: &Resource,
        input: &RawExposureInput,
    ) -> Result<ExposureConfig, StoreError> {
        let config = input.normalize();
        self.metadata
            .set_meta(resource.id, META_KEY, config.to_stored())
            .await?;
        debug!(
            resource = resource.id,
            expose = config.expose,
            fields = ?config.fields,
            "exposure config saved"
        );
        Ok(config)
    }
}

impl std::fmt::Debug for ExposureConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExposureConfigStore").finish_non_exhaustive()
    }
}
