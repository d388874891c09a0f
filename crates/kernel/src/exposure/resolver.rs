//! Selector resolution for exposed resources.

use std::sync::Arc;

use tracing::debug;

use super::config::ExposureConfig;
use crate::models::{RawRecord, Resource};
use crate::store::{ContentQuery, StoreError};

/// Placeholder standing for the exposed resource's path.
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Replace every `{page}` in `template` with the resource's stored path.
///
/// Substitution is a single pass: a path that itself contains `{page}` is
/// not expanded again.
pub fn substitute_placeholder(template: &str, resource: &Resource) -> String {
    template.replace(PAGE_PLACEHOLDER, &resource.path)
}

/// Runs a resource's configured selector against the content store.
#[derive(Clone)]
pub struct SelectorResolver {
    query: Arc<dyn ContentQuery>,
}

impl SelectorResolver {
    pub fn new(query: Arc<dyn ContentQuery>) -> Self {
        Self { query }
    }

    /// Query records for `resource`, projected to the whitelist.
    ///
    /// Store errors, including unparseable selectors, are passed through.
    pub async fn resolve(
        &self,
        resource: &Resource,
        config: &ExposureConfig,
    ) -> Result<Vec<RawRecord>, StoreError> {
        let selector = substitute_placeholder(&config.selector, resource);
        debug!(resource = resource.id, selector = %selector, "resolving selector");
        self.query.find_raw(&selector, &config.fields).await
    }
}

impl std::fmt::Debug for SelectorResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorResolver").finish_non_exhaustive()
    }
}
