//! Exposure service - request path to exposed JSON.
//!
//! A request moves through
//! `received -> resource resolved -> config loaded -> (not exposed | queried)
//! -> transformed`. Missing resources and unexposed resources end the same
//! way, with [`ExposureOutcome::Hidden`], so callers cannot tell them apart
//! from the outside.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use super::config::{ExposureConfig, ExposureConfigStore};
use super::pipeline::TransformationPipeline;
use super::registry::RegistryHandle;
use super::resolver::SelectorResolver;
use crate::models::{RawRecord, Resource};
use crate::store::{ContentQuery, ContentStore, MetadataStore, ResourceLookup, StoreError};

/// Exposure errors.
#[derive(Debug, Error)]
pub enum ExposureError {
    #[error("resource lookup failed: {0}")]
    Lookup(#[source] StoreError),

    #[error("query for resource {resource_id} failed: {source}")]
    Query {
        resource_id: i64,
        #[source]
        source: StoreError,
    },
}

impl ExposureError {
    /// Whether the failure stems from the configured selector text.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ExposureError::Query { source, .. } if source.is_selector_error())
    }
}

/// Why nothing was exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenReason {
    NotFound,
    NotExposed,
}

/// Data produced for an exposed resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposedData {
    pub resource: Resource,
    pub records: Vec<RawRecord>,
}

impl ExposedData {
    /// The records as a JSON array.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.records
                .iter()
                .cloned()
                .map(Value::Object)
                .collect(),
        )
    }
}

/// Result of serving a path.
#[derive(Debug, Clone, PartialEq)]
pub enum ExposureOutcome {
    Hidden(HiddenReason),
    Exposed(ExposedData),
}

/// Orchestrates lookup, configuration, query and transformation.
#[derive(Clone)]
pub struct ExposureService {
    lookup: Arc<dyn ResourceLookup>,
    configs: ExposureConfigStore,
    resolver: SelectorResolver,
    registry: Arc<RegistryHandle>,
    site_url: String,
}

impl ExposureService {
    /// Create a service from individual capabilities.
    pub fn new(
        lookup: Arc<dyn ResourceLookup>,
        query: Arc<dyn ContentQuery>,
        metadata: Arc<dyn MetadataStore>,
        registry: Arc<RegistryHandle>,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            lookup,
            configs: ExposureConfigStore::new(metadata),
            resolver: SelectorResolver::new(query),
            registry,
            site_url: site_url.into(),
        }
    }

    /// Create a service whose capabilities all come from one store.
    pub fn from_store<S>(store: Arc<S>, registry: Arc<RegistryHandle>, site_url: impl Into<String>) -> Self
    where
        S: ContentStore + 'static,
    {
        let lookup: Arc<dyn ResourceLookup> = store.clone();
        let query: Arc<dyn ContentQuery> = store.clone();
        let metadata: Arc<dyn MetadataStore> = store;
        Self::new(lookup, query, metadata, registry, site_url)
    }

    /// The configuration store used by this service.
    pub fn configs(&self) -> &ExposureConfigStore {
        &self.configs
    }

    pub fn registry(&self) -> &Arc<RegistryHandle> {
        &self.registry
    }

    /// Resolve a request path to a resource.
    pub async fn find_resource(&self, path: &str) -> Result<Option<Resource>, ExposureError> {
        self.lookup
            .find_by_path(path)
            .await
            .map_err(ExposureError::Lookup)
    }

    /// Serve the resource at `path`.
    pub async fn serve(&self, path: &str) -> Result<ExposureOutcome, ExposureError> {
        trace!(path = %path, "exposure request received");

        let Some(resource) = self.find_resource(path).await? else {
            debug!(path = %path, "no resource at path");
            return Ok(ExposureOutcome::Hidden(HiddenReason::NotFound));
        };
        trace!(path = %path, resource = resource.id, "resource resolved");

        let config = self.configs.load(&resource).await;
        trace!(resource = resource.id, expose = config.expose, "config loaded");

        if !config.expose {
            debug!(resource = resource.id, "resource not exposed");
            return Ok(ExposureOutcome::Hidden(HiddenReason::NotExposed));
        }

        let records = self.data(&resource, &config).await?;
        Ok(ExposureOutcome::Exposed(ExposedData { resource, records }))
    }

    /// Query and transform the records of an already resolved resource.
    ///
    /// Does not look at `config.expose`.
    pub async fn data(
        &self,
        resource: &Resource,
        config: &ExposureConfig,
    ) -> Result<Vec<RawRecord>, ExposureError> {
        let records = self
            .resolver
            .resolve(resource, config)
            .await
            .map_err(|source| ExposureError::Query {
                resource_id: resource.id,
                source,
            })?;
        trace!(resource = resource.id, records = records.len(), "records queried");

        let registry = self.registry.snapshot();
        if !registry.has_hooked_field(&config.fields) {
            debug!(resource = resource.id, records = records.len(), "exposed without transformers");
            return Ok(records);
        }

        let records = TransformationPipeline::new(&registry).apply(records, resource, &config.fields);
        debug!(resource = resource.id, records = records.len(), "records transformed");
        Ok(records)
    }

    /// Public API URL of `resource`.
    pub fn endpoint_url(&self, resource: &Resource) -> String {
        let base = self.site_url.trim_end_matches('/');
        let path = resource.path.trim_start_matches('/');
        format!("{base}/api/{path}")
    }
}

impl std::fmt::Debug for ExposureService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExposureService")
            .field("site_url", &self.site_url)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
