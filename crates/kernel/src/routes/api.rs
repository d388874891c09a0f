//! Public exposure API.
//!
//! `GET /api/{path}` serves the exposed records of the resource at `path`
//! as a JSON array. Unknown and unexposed resources both answer 404 with an
//! empty body.

use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::exposure::{ExposedData, ExposureOutcome};
use crate::middleware::ClientContext;
use crate::state::AppState;

/// Serve the root resource.
async fn serve_root(State(state): State<AppState>, client: ClientContext) -> AppResult<Response> {
    serve(&state, client, "/").await
}

/// Serve the resource at a path below the root.
async fn serve_path(
    State(state): State<AppState>,
    client: ClientContext,
    Path(path): Path<String>,
) -> AppResult<Response> {
    serve(&state, client, &format!("/{path}")).await
}

async fn serve(state: &AppState, client: ClientContext, path: &str) -> AppResult<Response> {
    match state.exposure().serve(path).await? {
        ExposureOutcome::Hidden(_) => Err(AppError::NotFound),
        ExposureOutcome::Exposed(data) => Ok(present(state, client, &data)),
    }
}

/// Encode exposed data for the client: an HTML dump for privileged browser
/// clients, JSON for everyone else and whenever the dump fails.
fn present(state: &AppState, client: ClientContext, data: &ExposedData) -> Response {
    if client.wants_dump()
        && let Some(dump) = state.dump()
    {
        let endpoint = state.exposure().endpoint_url(&data.resource);
        match dump.render(&data.resource, &endpoint, &data.records) {
            Ok(html) => return Html(html).into_response(),
            Err(e) => {
                warn!(resource = data.resource.id, error = %e, "dump rendering failed; sending JSON");
            }
        }
    }

    Json(data.to_json()).into_response()
}

/// Create the public API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api", get(serve_root))
        .route("/api/", get(serve_root))
        .route("/api/{*path}", get(serve_path))
}
