#![allow(clippy::unwrap_used, clippy::expect_used)]
//! PostgreSQL content store tests.
//!
//! These run against the database named by `DATABASE_URL` and are skipped
//! when it is unset. Each test owns a block of resource ids and clears it
//! before seeding, so reruns start from a clean slate.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use vetrina_kernel::exposure::{CallbackRegistry, RawExposureInput};
use vetrina_kernel::models::{RawRecord, Resource};
use vetrina_kernel::store::{MetadataStore, PgContentStore, ResourceLookup, StoreError};
use vetrina_kernel::{AppState, Config, db, routes};
use vetrina_test_utils::{assert, test_config};

mod common;
use common::json_body;

/// Connect, migrate and clear ids `base..base + 1000`.
async fn store(base: i64) -> Option<Arc<PgContentStore>> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping PostgreSQL test");
        return None;
    };

    let pool = db::create_pool(&url, &Config::default())
        .await
        .expect("Failed to connect to DATABASE_URL");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    sqlx::query("DELETE FROM resource WHERE id >= $1 AND id < $2")
        .bind(base)
        .bind(base + 1000)
        .execute(&pool)
        .await
        .expect("Failed to clear test resources");

    Some(Arc::new(PgContentStore::new(pool)))
}

fn child_of(parent: i64, id: i64, path: &str) -> Resource {
    let mut resource = Resource::new(id, path);
    resource.parent_id = Some(parent);
    resource
}

/// `/<section>/post-1/` with two titled children.
async fn seed_post(store: &PgContentStore, base: i64, section: &str) -> Resource {
    let post = Resource::new(base, format!("/{section}/post-1/")).with_template("post");
    store.insert(&post).await.unwrap();
    store
        .insert(&child_of(base, base + 10, &format!("/{section}/post-1/a/")).with_field("title", "Alpha"))
        .await
        .unwrap();
    store
        .insert(&child_of(base, base + 11, &format!("/{section}/post-1/b/")).with_field("title", "Beta"))
        .await
        .unwrap();
    post
}

async fn get(state: AppState, uri: &str) -> axum::response::Response {
    routes::build_router(state, &test_config())
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn path_lookup_ignores_trailing_slash() {
    const BASE: i64 = 910_000_000;
    let Some(store) = store(BASE).await else {
        return;
    };
    seed_post(&store, BASE, "pg-lookup").await;

    let with_slash = store.find_by_path("/pg-lookup/post-1/").await.unwrap().unwrap();
    let without = store.find_by_path("/pg-lookup/post-1").await.unwrap().unwrap();
    assert_eq!(with_slash, without);
    assert_eq!(with_slash.id, BASE);
    assert_eq!(with_slash.name, "post-1");
    assert_eq!(with_slash.num_children, 2);

    assert!(store.find_by_path("/pg-lookup/missing").await.unwrap().is_none());
}

#[tokio::test]
async fn exposed_post_serves_its_children() {
    const BASE: i64 = 920_000_000;
    let Some(store) = store(BASE).await else {
        return;
    };
    let post = seed_post(&store, BASE, "pg-serve").await;

    let state = AppState::with_store(Arc::clone(&store), CallbackRegistry::new(), &test_config()).unwrap();
    assert_eq!(get(state.clone(), "/api/pg-serve/post-1").await.status(), StatusCode::NOT_FOUND);

    state
        .exposure()
        .configs()
        .save(
            &post,
            &RawExposureInput {
                expose: Some("1".to_string()),
                fields: Some("id, title".to_string()),
                selector: Some("parent={page}".to_string()),
            },
        )
        .await
        .unwrap();

    let body = json_body(get(state, "/api/pg-serve/post-1").await, StatusCode::OK).await;
    assert::json_eq(
        &body,
        &json!([
            {"id": BASE + 10, "title": "Alpha"},
            {"id": BASE + 11, "title": "Beta"}
        ]),
    );

    let mut registry = CallbackRegistry::new();
    registry
        .register("title", |record: &RawRecord, _: &Resource| -> anyhow::Result<Value> {
            Ok(json!(record["title"].as_str().unwrap_or_default().to_uppercase()))
        })
        .unwrap();
    let state = AppState::with_store(Arc::clone(&store), registry, &test_config()).unwrap();

    let body = json_body(get(state, "/api/pg-serve/post-1/").await, StatusCode::OK).await;
    assert::json_eq(
        &body,
        &json!([
            {"id": BASE + 10, "title": "ALPHA"},
            {"id": BASE + 11, "title": "BETA"}
        ]),
    );
}

#[tokio::test]
async fn metadata_last_write_wins() {
    const BASE: i64 = 930_000_000;
    let Some(store) = store(BASE).await else {
        return;
    };
    store.insert(&Resource::new(BASE, "/pg-meta/")).await.unwrap();

    assert_eq!(store.meta(BASE, "exposure").await.unwrap(), None);

    store
        .set_meta(BASE, "exposure", json!({"version": 1, "expose": true}))
        .await
        .unwrap();
    store
        .set_meta(BASE, "exposure", json!({"version": 1, "expose": false, "fields": ["id"]}))
        .await
        .unwrap();
    store.set_meta(BASE, "other", json!("kept")).await.unwrap();

    assert_eq!(
        store.meta(BASE, "exposure").await.unwrap(),
        Some(json!({"version": 1, "expose": false, "fields": ["id"]}))
    );
    assert_eq!(store.meta(BASE, "other").await.unwrap(), Some(json!("kept")));

    assert!(matches!(
        store.set_meta(BASE + 1, "exposure", json!({})).await,
        Err(StoreError::UnknownResource(id)) if id == BASE + 1
    ));
}
