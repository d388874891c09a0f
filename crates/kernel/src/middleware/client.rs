//! Client classification middleware.
//!
//! Marks each request as privileged (valid admin bearer token) and/or
//! programmatic (`X-Requested-With: XMLHttpRequest`). Handlers read the
//! result through the [`ClientContext`] extractor.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Request, header, request::Parts},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::state::AppState;

/// Who is calling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientContext {
    /// Presented the admin token.
    pub privileged: bool,
    /// Identified itself as a script rather than a browser page load.
    pub ajax: bool,
}

impl ClientContext {
    /// Classify a request from its headers.
    ///
    /// Without a configured admin token nobody is privileged.
    pub fn from_headers(headers: &HeaderMap, admin_token: Option<&str>) -> Self {
        let expected = admin_token.map(str::trim).filter(|t| !t.is_empty());
        let privileged = match (expected, bearer_token(headers)) {
            (Some(expected), Some(presented)) => {
                bool::from(expected.as_bytes().ct_eq(presented.as_bytes()))
            }
            _ => false,
        };

        let ajax = headers
            .get("X-Requested-With")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));

        Self { privileged, ajax }
    }

    /// Whether the caller should get the human-readable dump.
    pub fn wants_dump(&self) -> bool {
        self.privileged && !self.ajax
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Middleware that classifies the caller and stores the result in request
/// extensions.
pub async fn classify_client(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let context = ClientContext::from_headers(request.headers(), state.admin_token());
    if context.privileged {
        debug!(path = %request.uri().path(), "privileged client");
    }
    request.extensions_mut().insert(context);
    next.run(request).await
}

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<ClientContext>()
            .copied()
            .unwrap_or_default())
    }
}
