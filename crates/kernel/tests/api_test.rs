#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for the public exposure API.
//!
//! These drive the real router over an in-memory content store.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};

use vetrina_kernel::exposure::{CallbackRegistry, DumpRenderer};
use vetrina_kernel::models::{RawRecord, Resource};
use vetrina_kernel::store::MemoryContentStore;
use vetrina_kernel::Config;
use vetrina_test_utils::{ADMIN_TOKEN, assert, blog_store, expose, test_config};

mod common;
use common::{TestApp, body_string, content_type, json_body};

// =============================================================================
// Serving
// =============================================================================

#[tokio::test]
async fn exposed_resource_serves_children_as_json() {
    let app = TestApp::new();
    expose(&app.store, 3, &["id", "title"], "parent={page}");

    let response = app.get("/api/blog/post-1").await;
    assert!(content_type(&response).starts_with("application/json"));

    let body = json_body(response, StatusCode::OK).await;
    assert::json_eq(
        &body,
        &json!([{"id": 10, "title": "Alpha"}, {"id": 11, "title": "Beta"}]),
    );
}

#[tokio::test]
async fn trailing_slash_and_root_paths_resolve() {
    let app = TestApp::new();
    expose(&app.store, 3, &["id"], "parent={page}");
    expose(&app.store, 1, &["id"], "parent={page}");

    let body = json_body(app.get("/api/blog/post-1/").await, StatusCode::OK).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let body = json_body(app.get("/api/").await, StatusCode::OK).await;
    assert::json_eq(&body, &json!([{"id": 2}, {"id": 5}]));

    let body = json_body(app.get("/api").await, StatusCode::OK).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unexposed_and_unknown_look_the_same() {
    let app = TestApp::new();

    let not_exposed = app.get("/api/blog/post-1").await;
    assert_eq!(not_exposed.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(not_exposed).await, "");

    let unknown = app.get("/api/does/not/exist").await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(unknown).await, "");
}

#[tokio::test]
async fn selector_language_reaches_the_store() {
    let app = TestApp::new();
    expose(
        &app.store,
        2,
        &["title", "rating"],
        "parent={page}, rating>=3, sort=-created",
    );

    let body = json_body(app.get("/api/blog").await, StatusCode::OK).await;
    assert::json_eq(&body, &json!([{"title": "First post", "rating": 4}]));
}

#[tokio::test]
async fn missing_fields_are_null() {
    let app = TestApp::new();
    expose(&app.store, 2, &["id", "rating"], "parent={page}, sort=id");

    let body = json_body(app.get("/api/blog/").await, StatusCode::OK).await;
    assert::json_eq(
        &body,
        &json!([{"id": 3, "rating": 4}, {"id": 4, "rating": 2}]),
    );

    let body = {
        expose(&app.store, 3, &["id", "rating"], "parent={page}");
        json_body(app.get("/api/blog/post-1/").await, StatusCode::OK).await
    };
    assert::json_eq(
        &body,
        &json!([{"id": 10, "rating": null}, {"id": 11, "rating": null}]),
    );
}

#[tokio::test]
async fn empty_selector_matches_everything() {
    let app = TestApp::new();
    expose(&app.store, 5, &["id"], "");

    let body = json_body(app.get("/api/about").await, StatusCode::OK).await;
    assert_eq!(body.as_array().unwrap().len(), app.store.len());
}

#[tokio::test]
async fn empty_match_is_an_empty_array() {
    let app = TestApp::new();
    expose(&app.store, 5, &["id"], "parent={page}");

    let response = app.get("/api/about").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "[]");
}

#[tokio::test]
async fn broken_selector_is_a_bad_request_without_body() {
    let app = TestApp::new();
    expose(&app.store, 3, &["id"], "parent={page}, title=\"unterminated");

    let response = app.get("/api/blog/post-1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(response).await, "");
}

// =============================================================================
// Transformers
// =============================================================================

fn uppercase_titles() -> CallbackRegistry {
    let mut registry = CallbackRegistry::new();
    registry
        .register(
            "title",
            |record: &RawRecord, _: &Resource| -> anyhow::Result<Value> {
                Ok(json!(record["title"].as_str().unwrap_or_default().to_uppercase()))
            },
        )
        .unwrap();
    registry
}

#[tokio::test]
async fn transformers_rewrite_whitelisted_fields() {
    let app = TestApp::with_registry(uppercase_titles());
    expose(&app.store, 3, &["id", "title"], "parent={page}");

    let body = json_body(app.get("/api/blog/post-1").await, StatusCode::OK).await;
    assert::json_eq(
        &body,
        &json!([{"id": 10, "title": "ALPHA"}, {"id": 11, "title": "BETA"}]),
    );
}

#[tokio::test]
async fn failing_transformer_blanks_only_its_field() {
    let mut registry = uppercase_titles();
    registry
        .register("id", |_: &RawRecord, _: &Resource| -> anyhow::Result<Value> {
            anyhow::bail!("id lookup failed")
        })
        .unwrap();
    let app = TestApp::with_registry(registry);
    expose(&app.store, 3, &["id", "title"], "parent={page}");

    let body = json_body(app.get("/api/blog/post-1").await, StatusCode::OK).await;
    assert::json_eq(
        &body,
        &json!([{"id": "", "title": "ALPHA"}, {"id": "", "title": "BETA"}]),
    );
}

#[tokio::test]
async fn transformer_sees_the_exposed_resource() {
    let mut registry = CallbackRegistry::new();
    registry
        .register("source", |_: &RawRecord, source: &Resource| -> anyhow::Result<Value> {
            Ok(json!(source.id))
        })
        .unwrap();
    let app = TestApp::with_registry(registry);
    expose(&app.store, 3, &["id", "source"], "parent={page}");

    let body = json_body(app.get("/api/blog/post-1").await, StatusCode::OK).await;
    assert::record_keys(&body, &["id", "source"]);
    assert_eq!(body[0]["source"], json!(3));
    assert_eq!(body[1]["source"], json!(3));
}

#[tokio::test]
async fn registry_changes_apply_to_later_requests() {
    let app = TestApp::new();
    expose(&app.store, 3, &["title"], "parent={page}");

    app.state
        .registry()
        .update(|registry| {
            registry.register(
                "title",
                |record: &RawRecord, _: &Resource| -> anyhow::Result<Value> {
                    Ok(json!(record["title"].as_str().unwrap_or_default().to_lowercase()))
                },
            )
        })
        .unwrap();
    let body = json_body(app.get("/api/blog/post-1").await, StatusCode::OK).await;
    assert::json_eq(&body, &json!([{"title": "alpha"}, {"title": "beta"}]));

    assert!(app.state.registry().update(|registry| registry.unregister("title")));
    let body = json_body(app.get("/api/blog/post-1").await, StatusCode::OK).await;
    assert::json_eq(&body, &json!([{"title": "Alpha"}, {"title": "Beta"}]));
}

// =============================================================================
// Debug dump
// =============================================================================

#[tokio::test]
async fn privileged_browser_gets_html_dump() {
    let app = TestApp::new();
    expose(&app.store, 3, &["id", "title"], "parent={page}");

    let response = app.get_as_admin("/api/blog/post-1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("text/html"));

    let html = body_string(response).await;
    assert::contains(&html, "Alpha");
    assert::contains(&html, "<dd>2</dd>");
}

#[tokio::test]
async fn privileged_ajax_gets_json() {
    let app = TestApp::new();
    expose(&app.store, 3, &["id"], "parent={page}");

    let response = app
        .request(
            Request::get("/api/blog/post-1")
                .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
                .header("X-Requested-With", "XMLHttpRequest")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    let body = json_body(response, StatusCode::OK).await;
    assert::json_eq(&body, &json!([{"id": 10}, {"id": 11}]));
}

#[tokio::test]
async fn failed_dump_falls_back_to_json() {
    let broken = DumpRenderer::with_template("{{ resource.path }} {{ missing.value }}").unwrap();
    let app = TestApp::with_dump(broken);
    expose(&app.store, 3, &["id", "title"], "parent={page}");

    let response = app.get_as_admin("/api/blog/post-1").await;
    assert!(content_type(&response).starts_with("application/json"));

    let body = json_body(response, StatusCode::OK).await;
    assert::json_eq(
        &body,
        &json!([{"id": 10, "title": "Alpha"}, {"id": 11, "title": "Beta"}]),
    );
}

#[tokio::test]
async fn dump_can_be_disabled() {
    let config = Config {
        debug_dump: false,
        ..test_config()
    };
    let app = TestApp::build(blog_store(), CallbackRegistry::new(), &config);
    expose(&app.store, 3, &["id"], "parent={page}");

    let response = app.get_as_admin("/api/blog/post-1").await;
    assert!(content_type(&response).starts_with("application/json"));
}

#[tokio::test]
async fn privileged_clients_still_get_404_for_hidden_resources() {
    let app = TestApp::new();
    let response = app.get_as_admin("/api/blog/post-1").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_reports_store_status() {
    let app = TestApp::build(
        std::sync::Arc::new(MemoryContentStore::with_root()),
        CallbackRegistry::new(),
        &test_config(),
    );

    let body = json_body(app.get("/health").await, StatusCode::OK).await;
    assert::json_eq(&body, &json!({"status": "healthy", "store": true}));
}
