//! Transformation pipeline.
//!
//! Rewrites whitelisted fields that have a registered transformer. Every
//! transformer sees the raw record as the store returned it, so the order
//! fields are processed in never matters. A transformer that fails (error
//! or panic) yields an empty string for its field and the request goes on.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde_json::Value;
use tracing::warn;

use super::registry::CallbackRegistry;
use crate::models::{RawRecord, Resource};

/// Applies a registry's transformers to query results.
#[derive(Debug, Clone, Copy)]
pub struct TransformationPipeline<'a> {
    registry: &'a CallbackRegistry,
}

impl<'a> TransformationPipeline<'a> {
    pub fn new(registry: &'a CallbackRegistry) -> Self {
        Self { registry }
    }

    /// Transform `records` for the exposed resource `source`.
    ///
    /// Only whitelisted fields are considered. Records keep their order and
    /// their key set.
    pub fn apply(
        &self,
        records: Vec<RawRecord>,
        source: &Resource,
        whitelist: &[String],
    ) -> Vec<RawRecord> {
        let hooked: Vec<&String> = whitelist
            .iter()
            .filter(|f| self.registry.contains(f))
            .collect();
        if hooked.is_empty() {
            return records;
        }

        records
            .into_iter()
            .map(|raw| {
                let mut record = raw.clone();
                for field in &hooked {
                    let value = self.transform_field(field, &raw, source);
                    record.insert((*field).clone(), value);
                }
                record
            })
            .collect()
    }

    fn transform_field(&self, field: &str, raw: &RawRecord, source: &Resource) -> Value {
        let Some(transformer) = self.registry.get(field) else {
            return raw.get(field).cloned().unwrap_or(Value::Null);
        };

        match catch_unwind(AssertUnwindSafe(|| transformer.transform(raw, source))) {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                warn!(field = %field, resource = source.id, error = %e, "transformer failed");
                Value::String(String::new())
            }
            Err(_) => {
                warn!(field = %field, resource = source.id, "transformer panicked");
                Value::String(String::new())
            }
        }
    }
}
