//! In-memory content store.
//!
//! Holds the resource tree behind a `parking_lot::RwLock` and metadata
//! slots in a `DashMap`, so metadata writes to different resources never
//! contend with each other or with tree readers. Native result order is
//! insertion order.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{ContentQuery, ContentStore, MetadataStore, ResourceLookup, StoreError};
use crate::models::{RawRecord, Resource, normalize_path, parent_path};
use crate::selector::{ResourceTree, Selector};

/// Fixture file layout for seeding a [`MemoryContentStore`].
///
/// ```yaml
/// resources:
///   - id: 1
///     path: /
///   - id: 2
///     path: /blog/
///     template: blog
///     fields: { title: Blog }
///     meta:
///       exposure: { expose: true, fields: [id, title], selector: "parent={page}" }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub resources: Vec<ResourceFixture>,
}

/// One resource entry of a [`StoreFixture`].
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceFixture {
    #[serde(flatten)]
    pub resource: Resource,

    /// Metadata slots to seed, keyed by slot name.
    #[serde(default)]
    pub meta: Map<String, Value>,
}

#[derive(Debug, Default)]
struct Tree {
    resources: Vec<Resource>,
    by_id: HashMap<i64, usize>,
    by_path: HashMap<String, usize>,
}

impl Tree {
    fn get(&self, id: i64) -> Option<&Resource> {
        self.by_id.get(&id).and_then(|&idx| self.resources.get(idx))
    }

    fn get_mut(&mut self, id: i64) -> Option<&mut Resource> {
        let idx = *self.by_id.get(&id)?;
        self.resources.get_mut(idx)
    }
}

impl ResourceTree for Tree {
    fn parent_of(&self, resource: &Resource) -> Option<&Resource> {
        resource.parent_id.and_then(|id| self.get(id))
    }
}

/// Content store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    tree: RwLock<Tree>,
    meta: DashMap<(i64, String), Value>,
}

impl MemoryContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding only the root resource (id 1, path `/`).
    pub fn with_root() -> Self {
        let store = Self::new();
        if let Err(e) = store.insert(Resource::new(1, "/").with_template("home")) {
            warn!(error = %e, "failed to insert root resource");
        }
        store
    }

    /// Build a store from a parsed fixture.
    ///
    /// Resources are inserted in fixture order, so parents must precede
    /// their children.
    pub fn from_fixture(fixture: StoreFixture) -> Result<Self, StoreError> {
        let store = Self::new();
        for entry in fixture.resources {
            let id = entry.resource.id;
            store.insert(entry.resource)?;
            for (key, value) in entry.meta {
                store.insert_meta(id, &key, value)?;
            }
        }
        Ok(store)
    }

    /// Build a store from fixture YAML.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let fixture: StoreFixture =
            serde_yml::from_str(yaml).context("failed to parse content fixture")?;
        Ok(Self::from_fixture(fixture)?)
    }

    /// Load a fixture file from disk.
    pub async fn load_fixture(path: &Path) -> anyhow::Result<Self> {
        let yaml = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read content fixture {}", path.display()))?;
        let store = Self::from_yaml(&yaml)?;
        info!(path = %path.display(), resources = store.len(), "content fixture loaded");
        Ok(store)
    }

    /// Insert a resource.
    ///
    /// The parent is taken from `parent_id` when set, otherwise derived from
    /// the path. Ids and normalized paths must be unique. `num_children` is
    /// maintained by the store; `created`/`modified` default to now.
    pub fn insert(&self, mut resource: Resource) -> Result<(), StoreError> {
        let mut tree = self.tree.write();
        let path = resource.normalized_path();

        if tree.by_id.contains_key(&resource.id) {
            return Err(StoreError::Conflict(format!(
                "resource id {} already exists",
                resource.id
            )));
        }
        if tree.by_path.contains_key(&path) {
            return Err(StoreError::Conflict(format!(
                "resource path '{path}' already exists"
            )));
        }

        match resource.parent_id {
            Some(parent_id) if tree.get(parent_id).is_none() => {
                return Err(StoreError::UnknownResource(parent_id));
            }
            Some(_) => {}
            None => {
                if let Some(parent) = parent_path(&path) {
                    let Some(&idx) = tree.by_path.get(&parent) else {
                        return Err(StoreError::Conflict(format!(
                            "parent '{parent}' of '{path}' does not exist"
                        )));
                    };
                    resource.parent_id = tree.resources.get(idx).map(|p| p.id);
                }
            }
        }

        if resource.name.is_empty() {
            resource.name = Resource::new(resource.id, path.clone()).name;
        }
        let now = chrono::Utc::now().timestamp();
        if resource.created == 0 {
            resource.created = now;
        }
        if resource.modified == 0 {
            resource.modified = resource.created;
        }
        resource.num_children = 0;

        if let Some(parent) = resource.parent_id.and_then(|id| tree.get_mut(id)) {
            parent.num_children += 1;
        }

        let idx = tree.resources.len();
        tree.by_id.insert(resource.id, idx);
        tree.by_path.insert(path, idx);
        tree.resources.push(resource);

        Ok(())
    }

    /// Seed a metadata slot synchronously.
    pub fn insert_meta(&self, resource_id: i64, key: &str, value: Value) -> Result<(), StoreError> {
        if self.tree.read().get(resource_id).is_none() {
            return Err(StoreError::UnknownResource(resource_id));
        }
        self.meta.insert((resource_id, key.to_string()), value);
        Ok(())
    }

    /// Fetch a resource by id.
    pub fn get(&self, id: i64) -> Option<Resource> {
        self.tree.read().get(id).cloned()
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.tree.read().resources.len()
    }

    /// Whether the store holds no resources.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResourceLookup for MemoryContentStore {
    async fn find_by_path(&self, path: &str) -> Result<Option<Resource>, StoreError> {
        let tree = self.tree.read();
        let found = tree
            .by_path
            .get(&normalize_path(path))
            .and_then(|&idx| tree.resources.get(idx))
            .cloned();
        Ok(found)
    }
}

#[async_trait]
impl ContentQuery for MemoryContentStore {
    async fn find_raw(
        &self,
        selector: &str,
        fields: &[String],
    ) -> Result<Vec<RawRecord>, StoreError> {
        let parsed: Selector = selector.parse()?;

        let tree = self.tree.read();
        let matched: Vec<&Resource> = tree
            .resources
            .iter()
            .filter(|r| parsed.matches(r, &*tree))
            .collect();
        let records: Vec<RawRecord> = parsed
            .order_and_page(matched)
            .into_iter()
            .map(|r| r.project(fields))
            .collect();

        debug!(selector = %selector, matches = records.len(), "memory query");
        Ok(records)
    }
}

#[async_trait]
impl MetadataStore for MemoryContentStore {
    async fn meta(&self, resource_id: i64, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .meta
            .get(&(resource_id, key.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn set_meta(&self, resource_id: i64, key: &str, value: Value) -> Result<(), StoreError> {
        self.insert_meta(resource_id, key, value)
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    fn engine(&self) -> &'static str {
        "memory"
    }

    async fn check_health(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blog_store() -> MemoryContentStore {
        let store = MemoryContentStore::with_root();
        store.insert(Resource::new(2, "/blog/")).unwrap();
        store
            .insert(Resource::new(3, "/blog/post-1/").with_template("post"))
            .unwrap();
        store
            .insert(Resource::new(10, "/blog/post-1/a/").with_field("title", "A"))
            .unwrap();
        store
            .insert(Resource::new(11, "/blog/post-1/b/").with_field("title", "B"))
            .unwrap();
        store
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn insert_derives_parent_and_counts_children() {
        let store = blog_store();
        let post = store.get(3).unwrap();
        assert_eq!(post.parent_id, Some(2));
        assert_eq!(post.num_children, 2);
        assert_eq!(post.name, "post-1");
        assert!(post.created > 0);
    }

    #[test]
    fn insert_rejects_duplicates_and_orphans() {
        let store = blog_store();
        assert!(matches!(
            store.insert(Resource::new(2, "/other/")),
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store.insert(Resource::new(99, "/blog")),
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store.insert(Resource::new(98, "/missing/child/")),
            Err(StoreError::Conflict(_))
        ));

        let mut explicit = Resource::new(97, "/x/");
        explicit.parent_id = Some(500);
        assert!(matches!(
            store.insert(explicit),
            Err(StoreError::UnknownResource(500))
        ));
    }

    #[tokio::test]
    async fn find_by_path_normalizes() {
        let store = blog_store();
        for path in ["/blog/post-1", "/blog/post-1/", "blog/post-1"] {
            let found = store.find_by_path(path).await.unwrap().unwrap();
            assert_eq!(found.id, 3);
        }
        assert!(store.find_by_path("/nope/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_raw_projects_children_in_order() {
        let store = blog_store();
        let records = store
            .find_raw("parent=/blog/post-1/", &fields(&["id", "title"]))
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&records).unwrap(),
            json!([{"id": 10, "title": "A"}, {"id": 11, "title": "B"}])
        );
    }

    #[tokio::test]
    async fn empty_selector_matches_everything() {
        let store = blog_store();
        let records = store.find_raw("", &fields(&["id"])).await.unwrap();
        assert_eq!(records.len(), 5);
    }

    #[tokio::test]
    async fn bad_selector_is_reported() {
        let store = blog_store();
        let err = store.find_raw("parent", &fields(&["id"])).await.unwrap_err();
        assert!(err.is_selector_error());
    }

    #[tokio::test]
    async fn metadata_round_trips_per_resource() {
        let store = blog_store();
        assert!(store.meta(3, "exposure").await.unwrap().is_none());

        store
            .set_meta(3, "exposure", json!({"expose": true}))
            .await
            .unwrap();
        assert_eq!(
            store.meta(3, "exposure").await.unwrap(),
            Some(json!({"expose": true}))
        );
        assert!(store.meta(2, "exposure").await.unwrap().is_none());

        assert!(matches!(
            store.set_meta(404, "exposure", json!({})).await,
            Err(StoreError::UnknownResource(404))
        ));
    }

    #[test]
    fn yaml_fixture_seeds_resources_and_meta() {
        let yaml = r#"
resources:
  - id: 1
    path: /
  - id: 2
    path: /blog/
    template: blog
    fields:
      title: Blog
    meta:
      exposure:
        expose: true
        fields: [id, title]
        selector: "parent={page}"
  - id: 3
    path: /blog/first/
    fields:
      title: First
"#;
        let store = MemoryContentStore::from_yaml(yaml).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(2).unwrap().template, "blog");
        assert_eq!(store.get(3).unwrap().parent_id, Some(2));
        assert!(store.meta.contains_key(&(2, "exposure".to_string())));
    }
}
