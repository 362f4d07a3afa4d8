use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub name: String,
    /// Extracted text, or a placeholder marker for formats the client could
    /// not extract (kept for listing, never used as context).
    #[serde(default)]
    pub content: String,
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state.store.list_documents().await?;
    Ok(Json(json!({ "documents": documents })))
}

pub async fn create_document(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDocumentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Document name is required".to_string()));
    }
    let document = state
        .store
        .create_document(&payload.name, &payload.content)
        .await?;
    Ok(Json(json!({ "document": document })))
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.delete_document(&document_id).await?;
    Ok(Json(json!({ "deleted": document_id })))
}
