//! Exposure configuration routes.
//!
//! Privileged clients read and submit the exposure settings of a resource.
//! Submissions use the form keys `exposure_expose`, `exposure_fields` and
//! `exposure_selector`.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::exposure::{ExposureConfig, RawExposureInput};
use crate::middleware::ClientContext;
use crate::models::Resource;
use crate::state::AppState;

/// Exposure settings of a resource, as shown to administrators.
#[derive(Debug, Serialize)]
pub struct ExposureStatus {
    pub resource_id: i64,
    pub path: String,
    pub num_children: i64,
    pub config: ExposureConfig,
    /// Field list in its editable form.
    pub fields_text: String,
    /// Public URL of the resource's API endpoint.
    pub endpoint: String,
    /// Records the current settings produce, even while not exposed.
    /// None when the query fails.
    pub preview: Option<Value>,
}

async fn show_root(State(state): State<AppState>, client: ClientContext) -> AppResult<Json<ExposureStatus>> {
    show(&state, client, "/").await
}

async fn show_path(
    State(state): State<AppState>,
    client: ClientContext,
    Path(path): Path<String>,
) -> AppResult<Json<ExposureStatus>> {
    show(&state, client, &format!("/{path}")).await
}

async fn save_root(
    State(state): State<AppState>,
    client: ClientContext,
    Form(form): Form<HashMap<String, String>>,
) -> AppResult<Json<ExposureStatus>> {
    save(&state, client, "/", &form).await
}

async fn save_path(
    State(state): State<AppState>,
    client: ClientContext,
    Path(path): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> AppResult<Json<ExposureStatus>> {
    save(&state, client, &format!("/{path}"), &form).await
}

async fn show(state: &AppState, client: ClientContext, path: &str) -> AppResult<Json<ExposureStatus>> {
    let resource = require_resource(state, client, path).await?;
    let config = state.exposure().configs().load(&resource).await;
    Ok(Json(status(state, resource, config).await))
}

async fn save(
    state: &AppState,
    client: ClientContext,
    path: &str,
    form: &HashMap<String, String>,
) -> AppResult<Json<ExposureStatus>> {
    let resource = require_resource(state, client, path).await?;
    let input = RawExposureInput::from_form(form);
    let config = state.exposure().configs().save(&resource, &input).await?;

    info!(
        resource = resource.id,
        expose = config.expose,
        fields = config.fields.len(),
        "exposure settings updated"
    );

    Ok(Json(status(state, resource, config).await))
}

async fn require_resource(state: &AppState, client: ClientContext, path: &str) -> AppResult<Resource> {
    if !client.privileged {
        return Err(AppError::Forbidden);
    }
    state
        .exposure()
        .find_resource(path)
        .await?
        .ok_or(AppError::NotFound)
}

async fn status(state: &AppState, resource: Resource, config: ExposureConfig) -> ExposureStatus {
    let preview = match state.exposure().data(&resource, &config).await {
        Ok(records) => Some(Value::Array(records.into_iter().map(Value::Object).collect())),
        Err(e) => {
            debug!(resource = resource.id, error = %e, "preview unavailable");
            None
        }
    };

    ExposureStatus {
        resource_id: resource.id,
        endpoint: state.exposure().endpoint_url(&resource),
        fields_text: config.fields_text(),
        path: resource.path,
        num_children: resource.num_children,
        config,
        preview,
    }
}

/// Create the exposure admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/exposure", get(show_root).post(save_root))
        .route("/admin/exposure/", get(show_root).post(save_root))
        .route("/admin/exposure/{*path}", get(show_path).post(save_path))
}
