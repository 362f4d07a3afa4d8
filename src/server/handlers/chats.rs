use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub title: Option<String>,
}

pub async fn list_chats(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let chats = state.store.list_chats().await?;
    Ok(Json(json!({ "chats": chats })))
}

pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state.store.create_chat(payload.title).await?;
    Ok(Json(json!({ "chat": chat })))
}

pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let chat = state
        .store
        .get_chat(&chat_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chat not found".to_string()))?;
    let messages = state.store.get_messages(&chat_id, 100).await?;
    Ok(Json(json!({ "chat": chat, "messages": messages })))
}

pub async fn delete_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.store.get_chat(&chat_id).await?.is_none() {
        return Err(ApiError::NotFound("Chat not found".to_string()));
    }
    state.store.delete_chat(&chat_id).await?;
    Ok(Json(json!({ "deleted": chat_id })))
}

pub async fn get_chat_messages(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(100);
    let messages = state.store.get_messages(&chat_id, limit).await?;
    Ok(Json(json!({ "messages": messages })))
}
