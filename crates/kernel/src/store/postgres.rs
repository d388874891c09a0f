//! PostgreSQL content store.
//!
//! Resources live in the `resource` table (see `migrations/`). Custom field
//! values are a JSONB column; metadata slots are keys of the `meta` JSONB
//! column, each replaced with a single `jsonb_set` update.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;

use super::query_builder::ResourceQueryBuilder;
use super::{ContentQuery, ContentStore, MetadataStore, ResourceLookup, StoreError};
use crate::models::{RawRecord, Resource, normalize_path};
use crate::selector::Selector;

/// Row shape shared by every resource query.
#[derive(Debug, sqlx::FromRow)]
struct ResourceRow {
    id: i64,
    parent_id: Option<i64>,
    name: String,
    path: String,
    template: String,
    fields: Value,
    created: i64,
    modified: i64,
    num_children: i64,
}

impl From<ResourceRow> for Resource {
    fn from(row: ResourceRow) -> Self {
        Resource {
            id: row.id,
            parent_id: row.parent_id,
            name: row.name,
            path: row.path,
            template: row.template,
            num_children: row.num_children,
            created: row.created,
            modified: row.modified,
            fields: match row.fields {
                Value::Object(map) => map,
                _ => serde_json::Map::new(),
            },
        }
    }
}

/// Content store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a resource row. `num_children` is derived, not stored.
    pub async fn insert(&self, resource: &Resource) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO resource (id, parent_id, name, path, template, fields, meta, created, modified)
            VALUES ($1, $2, $3, $4, $5, $6, '{}'::jsonb, $7, $8)
            "#,
        )
        .bind(resource.id)
        .bind(resource.parent_id)
        .bind(&resource.name)
        .bind(&resource.path)
        .bind(&resource.template)
        .bind(Value::Object(resource.fields.clone()))
        .bind(resource.created)
        .bind(resource.modified)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ResourceLookup for PgContentStore {
    async fn find_by_path(&self, path: &str) -> Result<Option<Resource>, StoreError> {
        let normalized = normalize_path(path);
        let with_slash = if normalized == "/" {
            normalized.clone()
        } else {
            format!("{normalized}/")
        };

        let row = sqlx::query_as::<_, ResourceRow>(
            r#"
            SELECT id, parent_id, name, path, template, fields, created, modified,
                   (SELECT COUNT(*) FROM resource AS child WHERE child.parent_id = resource.id) AS num_children
            FROM resource
            WHERE path = $1 OR path = $2
            LIMIT 1
            "#,
        )
        .bind(&normalized)
        .bind(&with_slash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Resource::from))
    }
}

#[async_trait]
impl ContentQuery for PgContentStore {
    async fn find_raw(
        &self,
        selector: &str,
        fields: &[String],
    ) -> Result<Vec<RawRecord>, StoreError> {
        let parsed: Selector = selector.parse()?;
        let sql = ResourceQueryBuilder::new(&parsed).build();
        debug!(selector = %selector, sql = %sql, "postgres query");

        let rows = sqlx::query_as::<_, ResourceRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Resource::from(row).project(fields))
            .collect())
    }
}

#[async_trait]
impl MetadataStore for PgContentStore {
    async fn meta(&self, resource_id: i64, key: &str) -> Result<Option<Value>, StoreError> {
        let value = sqlx::query_scalar::<_, Option<Value>>(
            "SELECT meta -> $2 FROM resource WHERE id = $1",
        )
        .bind(resource_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.flatten().filter(|v| !v.is_null()))
    }

    async fn set_meta(&self, resource_id: i64, key: &str, value: Value) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE resource
            SET meta = jsonb_set(COALESCE(meta, '{}'::jsonb), ARRAY[$2]::text[], $3, true)
            WHERE id = $1
            "#,
        )
        .bind(resource_id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownResource(resource_id));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn check_health(&self) -> bool {
        crate::db::check_health(&self.pool).await
    }
}
