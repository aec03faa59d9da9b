//! Request handlers for the form server

use std::sync::Arc;

use atrius_form_schema::FormStore;
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::SecondsFormat;
use tracing::{debug, info};

use super::error::{ServerError, ServerResult};

/// Handler for GET /forms - lists the published forms
pub async fn list_forms(State(store): State<Arc<FormStore>>) -> impl IntoResponse {
    debug!("Handling form list request");
    let snapshot = store.snapshot();

    let forms: Vec<serde_json::Value> = snapshot
        .forms
        .values()
        .map(|form| {
            serde_json::json!({
                "key": form.key,
                "title": form.title,
                "role": form.role,
            })
        })
        .collect();

    Json(serde_json::json!({
        "forms": forms,
        "loadedAt": snapshot.loaded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

/// Handler for GET /forms/{key} - returns one compiled form schema
pub async fn get_form(
    State(store): State<Arc<FormStore>>,
    Path(key): Path<String>,
) -> ServerResult<impl IntoResponse> {
    debug!(form = %key, "Handling form request");
    let snapshot = store.snapshot();
    let form = snapshot
        .get(&key)
        .ok_or_else(|| ServerError::NotFound(format!("No form with key '{}'", key)))?;

    let body = serde_json::to_vec(form)
        .map_err(|err| ServerError::InternalError(format!("Failed to serialize form: {}", err)))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    ))
}

/// Handler for POST /forms/$reload - recompiles the data directory and publishes it
pub async fn reload(State(store): State<Arc<FormStore>>) -> ServerResult<impl IntoResponse> {
    info!("Handling reload request");
    let forms = store.reload().await?;

    Ok(Json(serde_json::json!({
        "forms": forms.len(),
        "loadedAt": forms.loaded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    })))
}

/// Simple health check endpoint
pub async fn health_check() -> impl IntoResponse {
    debug!("Handling Health Check request");
    Json(serde_json::json!({
        "status": "ok",
        "service": "atrius-form-server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
