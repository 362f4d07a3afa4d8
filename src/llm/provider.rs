use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use super::types::ChatMessage;
use crate::core::errors::ApiError;

/// A streaming completion backend. Implementations relay the provider's raw
/// SSE byte stream chunk by chunk; they must not buffer the whole response.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// return the backend name (e.g. "gateway")
    fn name(&self) -> &str;

    /// streamed chat completion over `[system, ...history]`
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<mpsc::Receiver<Result<Bytes, ApiError>>, ApiError>;
}
