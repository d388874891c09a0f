//! Vetrina test utilities.
//!
//! Helpers for integration testing: resource builders, a populated
//! in-memory content store, and assertion utilities for exposed JSON.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use serde_json::Value as JsonValue;
use vetrina_kernel::exposure::ExposureConfig;
use vetrina_kernel::exposure::config::META_KEY;
use vetrina_kernel::models::Resource;
use vetrina_kernel::store::MemoryContentStore;

/// Token accepted as privileged by [`test_config`].
pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Create a test resource with default values.
pub fn test_resource(id: i64, path: &str) -> TestResource {
    TestResource {
        id,
        path: path.to_string(),
        template: "page".to_string(),
        fields: serde_json::json!({}),
        created: 1_700_000_000,
    }
}

/// A test resource builder for creating fixtures.
#[derive(Debug, Clone)]
pub struct TestResource {
    pub id: i64,
    pub path: String,
    pub template: String,
    pub fields: JsonValue,
    pub created: i64,
}

impl TestResource {
    /// Set the template.
    pub fn with_template(mut self, template: &str) -> Self {
        self.template = template.to_string();
        self
    }

    /// Add a single field.
    pub fn with_field(mut self, name: &str, value: JsonValue) -> Self {
        if let Some(obj) = self.fields.as_object_mut() {
            obj.insert(name.to_string(), value);
        }
        self
    }

    /// Add a `title` field.
    pub fn titled(self, title: &str) -> Self {
        self.with_field("title", JsonValue::from(title))
    }

    /// Set the creation timestamp.
    pub fn created_at(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    /// Build the resource.
    pub fn build(self) -> Resource {
        let mut resource = Resource::new(self.id, self.path).with_template(self.template);
        if let JsonValue::Object(fields) = self.fields {
            resource.fields = fields;
        }
        resource.created = self.created;
        resource.modified = self.created;
        resource
    }
}

/// A store holding a small blog:
///
/// ```text
/// /                   1
/// /blog/              2  (blog)
/// /blog/post-1/       3  (post, "First post")
/// /blog/post-1/a/    10  ("Alpha")
/// /blog/post-1/b/    11  ("Beta")
/// /blog/post-2/       4  (post, "Second post")
/// /about/             5  (page, "About")
/// ```
///
/// Nothing is exposed.
pub fn blog_store() -> Arc<MemoryContentStore> {
    let store = MemoryContentStore::with_root();
    let resources = [
        test_resource(2, "/blog/").with_template("blog").titled("Blog"),
        test_resource(3, "/blog/post-1/")
            .with_template("post")
            .titled("First post")
            .with_field("rating", JsonValue::from(4)),
        test_resource(10, "/blog/post-1/a/").titled("Alpha").created_at(1_700_000_010),
        test_resource(11, "/blog/post-1/b/").titled("Beta").created_at(1_700_000_020),
        test_resource(4, "/blog/post-2/")
            .with_template("post")
            .titled("Second post")
            .with_field("rating", JsonValue::from(2)),
        test_resource(5, "/about/").titled("About"),
    ];
    for resource in resources {
        store.insert(resource.build()).unwrap();
    }
    Arc::new(store)
}

/// Mark resource `id` as exposed with the given whitelist and selector.
pub fn expose(store: &MemoryContentStore, id: i64, fields: &[&str], selector: &str) {
    let config = ExposureConfig {
        expose: true,
        fields: fields.iter().map(|s| s.to_string()).collect(),
        selector: selector.to_string(),
    };
    store.insert_meta(id, META_KEY, config.to_stored()).unwrap();
}

/// Configuration for tests: in-memory store, [`ADMIN_TOKEN`], dump on.
pub fn test_config() -> vetrina_kernel::Config {
    vetrina_kernel::Config {
        admin_token: Some(ADMIN_TOKEN.to_string()),
        ..vetrina_kernel::Config::default()
    }
}

/// Assertion helpers for JSON content.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert that a JSON value equals expected.
    pub fn json_eq(actual: &Value, expected: &Value) {
        assert_eq!(
            actual,
            expected,
            "JSON mismatch:\nactual: {}\nexpected: {}",
            serde_json::to_string_pretty(actual).unwrap(),
            serde_json::to_string_pretty(expected).unwrap()
        );
    }

    /// Assert that every record of a JSON array has exactly `keys`, in order.
    pub fn record_keys(records: &Value, keys: &[&str]) {
        let records = records.as_array().expect("expected a JSON array");
        for record in records {
            let actual: Vec<&str> = record
                .as_object()
                .expect("expected a JSON object")
                .keys()
                .map(String::as_str)
                .collect();
            assert_eq!(actual, keys, "record keys mismatch in {record}");
        }
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }
}
