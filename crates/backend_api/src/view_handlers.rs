use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use dashboard_engine::{url_state, FilterState, SavedViews, ViewStore};
use serde::Deserialize;

use crate::{error::ApiError, handlers::AppState, Result};

/// Body of POST /api/views. `query` wins over `filters` when both are sent.
#[derive(Debug, Deserialize)]
pub struct CreateViewRequest {
    pub name: String,
    #[serde(default)]
    pub filters: Option<FilterState>,
    #[serde(default)]
    pub query: Option<String>,
}

/// Runs `op` on the saved views off the async runtime; the file store does blocking I/O.
async fn with_views<T, F>(state: &AppState, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut SavedViews<Box<dyn ViewStore>>) -> dashboard_engine::Result<T> + Send + 'static,
{
    let mut views = state.views.clone().lock_owned().await;
    let result = tokio::task::spawn_blocking(move || op(&mut views))
        .await
        .map_err(|e| ApiError::Internal(format!("saved views task failed: {e}")))?;
    Ok(result?)
}

/// GET /api/views
pub async fn list_views(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let views = with_views(&state, |views| views.list()).await?;
    Ok(Json(views))
}

/// GET /api/views/default
pub async fn get_default_view(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let view = with_views(&state, |views| views.default_view())
        .await?
        .ok_or_else(|| ApiError::ViewNotFound("default".to_string()))?;
    Ok(Json(view))
}

/// POST /api/views
pub async fn create_view(
    State(state): State<AppState>,
    Json(request): Json<CreateViewRequest>,
) -> Result<impl IntoResponse> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("view name must not be empty".to_string()));
    }

    let filters = match request.query.as_deref() {
        Some(query) => url_state::decode(query)?,
        None => request.filters.unwrap_or_default(),
    };

    let name = name.to_string();
    let view = with_views(&state, move |views| views.save(&name, filters)).await?;
    tracing::info!("Saved view '{}' ({})", view.name, view.id);
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/views/:id
pub async fn get_view(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse> {
    let lookup = id.clone();
    let view = with_views(&state, move |views| views.get(&lookup))
        .await?
        .ok_or(ApiError::ViewNotFound(id))?;
    Ok(Json(view))
}

/// DELETE /api/views/:id
pub async fn delete_view(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse> {
    let target = id.clone();
    if !with_views(&state, move |views| views.remove(&target)).await? {
        return Err(ApiError::ViewNotFound(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/views/:id/default
pub async fn set_default_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let target = id.clone();
    let view = with_views(&state, move |views| views.set_default(&target))
        .await?
        .ok_or(ApiError::ViewNotFound(id))?;
    Ok(Json(view))
}
