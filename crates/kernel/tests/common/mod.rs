#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Each [`TestApp`] wraps the real router and state over its own in-memory
//! content store, so tests never share mutable state.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use vetrina_kernel::exposure::{CallbackRegistry, DumpRenderer};
use vetrina_kernel::store::MemoryContentStore;
use vetrina_kernel::{AppState, Config, routes};
use vetrina_test_utils::{ADMIN_TOKEN, blog_store, test_config};

/// Test application wrapper using the real kernel routes and state.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryContentStore>,
    pub state: AppState,
}

impl TestApp {
    /// Blog fixture, no transformers.
    pub fn new() -> Self {
        Self::with_registry(CallbackRegistry::new())
    }

    /// Blog fixture with the given transformers.
    pub fn with_registry(registry: CallbackRegistry) -> Self {
        Self::build(blog_store(), registry, &test_config())
    }

    /// Fully custom application.
    pub fn build(store: Arc<MemoryContentStore>, registry: CallbackRegistry, config: &Config) -> Self {
        let state = AppState::with_store(Arc::clone(&store), registry, config)
            .expect("Failed to initialize AppState");
        Self::from_state(store, state, config)
    }

    /// Blog fixture rendering dumps with `dump`.
    pub fn with_dump(dump: DumpRenderer) -> Self {
        let store = blog_store();
        let config = test_config();
        let state = AppState::with_dump(Arc::clone(&store), CallbackRegistry::new(), &config, dump);
        Self::from_state(store, state, &config)
    }

    fn from_state(store: Arc<MemoryContentStore>, state: AppState, config: &Config) -> Self {
        let router = routes::build_router(state.clone(), config);
        Self {
            router,
            store,
            state,
        }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// Anonymous GET.
    pub async fn get(&self, uri: &str) -> Response {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    /// GET with the admin bearer token.
    pub async fn get_as_admin(&self, uri: &str) -> Response {
        self.request(
            Request::get(uri)
                .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Form POST, optionally with the admin bearer token.
    pub async fn post_form(&self, uri: &str, body: &str, admin: bool) -> Response {
        let mut builder = Request::post(uri).header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        );
        if admin {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"));
        }
        self.request(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }
}

/// Read a response body as a string.
pub async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Read a response body as JSON, asserting the status first.
pub async fn json_body(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    let body = body_string(response).await;
    serde_json::from_str(&body).unwrap_or_else(|e| panic!("invalid JSON ({e}): {body}"))
}

/// Content type header of a response.
pub fn content_type(response: &Response) -> String {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
