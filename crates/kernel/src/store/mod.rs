//! Content store abstraction layer.
//!
//! The exposure pipeline never reaches into a concrete storage engine. It is
//! handed three narrow capabilities instead:
//!
//! - [`ResourceLookup`] - resolve a path to a resource
//! - [`ContentQuery`] - run a selector and project the matches to fields
//! - [`MetadataStore`] - read and write named metadata slots
//!
//! [`ContentStore`] bundles the three for the composition root. Two engines
//! ship with the kernel: [`MemoryContentStore`] and [`PgContentStore`].

mod memory;
mod postgres;
mod query_builder;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use memory::{MemoryContentStore, ResourceFixture, StoreFixture};
pub use postgres::PgContentStore;
pub use query_builder::ResourceQueryBuilder;

use crate::models::{RawRecord, Resource};
use crate::selector::SelectorError;

/// Content store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid selector: {0}")]
    Selector(#[from] SelectorError),

    #[error("resource {0} does not exist")]
    UnknownResource(i64),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Whether the error was caused by the query text rather than the store.
    pub fn is_selector_error(&self) -> bool {
        matches!(self, StoreError::Selector(_))
    }
}

/// Resolve request paths to resources.
#[async_trait]
pub trait ResourceLookup: Send + Sync {
    /// Find the resource at `path`.
    ///
    /// Paths are compared in normalized form, so `/blog`, `/blog/` and
    /// `blog` all find the same resource. Returns `None` when nothing
    /// matches.
    async fn find_by_path(&self, path: &str) -> Result<Option<Resource>, StoreError>;
}

/// Run selector queries.
#[async_trait]
pub trait ContentQuery: Send + Sync {
    /// Find resources matching `selector`, projected to exactly `fields`.
    ///
    /// Records come back in the store's native order unless the selector
    /// sorts. An empty selector matches every resource.
    async fn find_raw(&self, selector: &str, fields: &[String])
    -> Result<Vec<RawRecord>, StoreError>;
}

/// Read and write per-resource metadata slots.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Read slot `key` of resource `resource_id`. `None` when unset.
    async fn meta(&self, resource_id: i64, key: &str) -> Result<Option<Value>, StoreError>;

    /// Replace slot `key` of resource `resource_id` in a single write.
    async fn set_meta(&self, resource_id: i64, key: &str, value: Value) -> Result<(), StoreError>;
}

/// A complete content store engine.
#[async_trait]
pub trait ContentStore: ResourceLookup + ContentQuery + MetadataStore {
    /// Short engine name for logs.
    fn engine(&self) -> &'static str;

    /// Whether the store can currently serve requests.
    async fn check_health(&self) -> bool;
}
