//! Callback registry - maps output field names to transformers.
//!
//! Extensions register a [`Transformer`] per field name at startup. When a
//! field with a registered transformer is whitelisted on an exposed
//! resource, the pipeline replaces the stored value with the transformer's
//! output.
//!
//! The registry itself is a plain value. [`RegistryHandle`] shares it
//! between request handlers copy-on-write: readers take a cheap snapshot,
//! writers swap in a modified clone.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{RawRecord, Resource};
use crate::selector::is_valid_field_name;

/// Computes the exposed value of one field.
///
/// `record` is the raw, untransformed record being emitted; `source` is the
/// exposed resource the request was made for (not the record's resource).
pub trait Transformer: Send + Sync {
    fn transform(&self, record: &RawRecord, source: &Resource) -> anyhow::Result<Value>;
}

impl<F> Transformer for F
where
    F: Fn(&RawRecord, &Resource) -> anyhow::Result<Value> + Send + Sync,
{
    fn transform(&self, record: &RawRecord, source: &Resource) -> anyhow::Result<Value> {
        self(record, source)
    }
}

/// Registration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a transformer is already registered for field '{0}'")]
    Duplicate(String),

    #[error("'{0}' is not a valid field name")]
    InvalidField(String),
}

/// Field name to transformer mapping.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    transformers: HashMap<String, Arc<dyn Transformer>>,
}

impl CallbackRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `transformer` for `field`, replacing any earlier one.
    ///
    /// Replacement is logged at warn level. Returns whether a transformer
    /// was replaced.
    pub fn register<T>(&mut self, field: &str, transformer: T) -> Result<bool, RegistryError>
    where
        T: Transformer + 'static,
    {
        validate(field)?;
        let replaced = self
            .transformers
            .insert(field.to_string(), Arc::new(transformer))
            .is_some();
        if replaced {
            warn!(field = %field, "transformer replaced");
        } else {
            info!(field = %field, "transformer registered");
        }
        Ok(replaced)
    }

    /// Register `transformer` for `field` unless one is already registered.
    pub fn try_register<T>(&mut self, field: &str, transformer: T) -> Result<(), RegistryError>
    where
        T: Transformer + 'static,
    {
        validate(field)?;
        if self.transformers.contains_key(field) {
            return Err(RegistryError::Duplicate(field.to_string()));
        }
        self.transformers
            .insert(field.to_string(), Arc::new(transformer));
        info!(field = %field, "transformer registered");
        Ok(())
    }

    /// Remove the transformer for `field`. Returns whether one existed.
    pub fn unregister(&mut self, field: &str) -> bool {
        self.transformers.remove(field).is_some()
    }

    /// The transformer for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&Arc<dyn Transformer>> {
        self.transformers.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.transformers.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Registered field names, sorted.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.transformers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether any field of `whitelist` has a transformer.
    pub fn has_hooked_field(&self, whitelist: &[String]) -> bool {
        !self.is_empty() && whitelist.iter().any(|f| self.contains(f))
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("fields", &self.field_names())
            .finish()
    }
}

fn validate(field: &str) -> Result<(), RegistryError> {
    if is_valid_field_name(field) {
        Ok(())
    } else {
        Err(RegistryError::InvalidField(field.to_string()))
    }
}

/// Shared, swappable registry.
///
/// Requests hold an `Arc` snapshot for their whole lifetime, so a
/// registration made mid-request never changes a response half-way.
#[derive(Debug, Default)]
pub struct RegistryHandle {
    current: RwLock<Arc<CallbackRegistry>>,
}

impl RegistryHandle {
    pub fn new(registry: CallbackRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// The registry as of now.
    pub fn snapshot(&self) -> Arc<CallbackRegistry> {
        Arc::clone(&self.current.read())
    }

    /// Modify the registry. Readers see either the old or the new version.
    pub fn update<R>(&self, f: impl FnOnce(&mut CallbackRegistry) -> R) -> R {
        let mut guard = self.current.write();
        let mut next = CallbackRegistry::clone(&guard);
        let result = f(&mut next);
        *guard = Arc::new(next);
        result
    }
}
