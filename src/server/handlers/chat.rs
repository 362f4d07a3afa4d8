//! The chat-completion pipeline: classify, gather live data, assemble the
//! system prompt, then relay the provider's SSE stream verbatim while a
//! collector tees the chunks for post-stream persistence.

use std::io;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::context::{ContextAssembler, ContextConfig, DocumentInput};
use crate::core::errors::ApiError;
use crate::history::ChatStore;
use crate::intent;
use crate::llm::{ChatMessage, CompletionBackend};
use crate::state::AppState;
use crate::stream::StreamCollector;

#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Documents sent with the request. When absent, the stored document
    /// library is used instead.
    #[serde(default)]
    pub documents: Option<Vec<DocumentInput>>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

pub async fn chat_completion(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatCompletionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_message = payload
        .messages
        .iter()
        .rev()
        .find(|msg| msg.is_user())
        .ok_or_else(|| ApiError::BadRequest("No user message in request".to_string()))?
        .content
        .clone();

    let query_intent = intent::classify(&user_message);
    tracing::info!(
        stock = query_intent.needs_stock,
        gold = query_intent.needs_gold,
        news = query_intent.needs_news,
        politics = query_intent.needs_politics,
        language = %query_intent.language,
        "classified query"
    );

    // All flagged fetchers run in parallel and the join completes before
    // prompt assembly begins.
    let summaries = state.live.gather(&query_intent).await;

    let documents = match payload.documents {
        Some(documents) => documents,
        None => state
            .store
            .list_documents()
            .await?
            .into_iter()
            .map(|doc| DocumentInput {
                name: doc.name,
                content: doc.content,
            })
            .collect(),
    };

    let assembler = ContextAssembler::new(ContextConfig::default());
    let system_prompt = assembler.assemble(query_intent.language, &summaries, &documents);

    if let Some(chat_id) = &payload.chat_id {
        if state.store.get_chat(chat_id).await?.is_none() {
            return Err(ApiError::NotFound("Chat not found".to_string()));
        }
        state.store.maybe_autotitle(chat_id, &user_message).await?;
        state
            .store
            .append_message(chat_id, "user", &user_message, &[], None)
            .await?;
    }

    let mut llm_messages = Vec::with_capacity(payload.messages.len() + 1);
    llm_messages.push(ChatMessage::system(system_prompt));
    llm_messages.extend(payload.messages);

    let rx = state.gateway.stream_chat(llm_messages).await?;

    let relay = RelayState {
        rx,
        collector: Some(StreamCollector::new()),
        store: state.store.clone(),
        chat_id: payload.chat_id,
    };
    let body = Body::from_stream(futures_util::stream::unfold(relay, relay_step));

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .map_err(ApiError::internal)
}

struct RelayState {
    rx: mpsc::Receiver<Result<Bytes, ApiError>>,
    /// Dropped on a mid-stream failure so a partial answer is never persisted.
    collector: Option<StreamCollector>,
    store: ChatStore,
    chat_id: Option<String>,
}

async fn relay_step(mut state: RelayState) -> Option<(Result<Bytes, io::Error>, RelayState)> {
    match state.rx.recv().await {
        Some(Ok(bytes)) => {
            if let Some(collector) = state.collector.as_mut() {
                collector.push_bytes(&bytes);
            }
            Some((Ok(bytes), state))
        }
        Some(Err(err)) => {
            tracing::error!("stream relay failed: {}", err);
            state.collector = None;
            Some((
                Err(io::Error::new(io::ErrorKind::Other, err.to_string())),
                state,
            ))
        }
        None => {
            persist_answer(&mut state).await;
            None
        }
    }
}

/// Persists the assistant turn after the stream ends, only when the provider
/// signalled natural completion and the turn belongs to a chat.
async fn persist_answer(state: &mut RelayState) {
    let (Some(collector), Some(chat_id)) = (state.collector.take(), state.chat_id.as_deref())
    else {
        return;
    };
    if !collector.completed() || collector.content().is_empty() {
        return;
    }

    let answer = collector.finish();
    if let Err(err) = state
        .store
        .append_message(
            chat_id,
            "assistant",
            &answer.content,
            &answer.evidence,
            answer.confidence,
        )
        .await
    {
        tracing::error!("failed to persist assistant message: {}", err);
    }
}
