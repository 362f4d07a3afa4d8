use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::json;
use tokio::sync::mpsc;

use super::provider::CompletionBackend;
use super::types::ChatMessage;
use crate::core::config::GatewayConfig;
use crate::core::errors::ApiError;

/// OpenAI-compatible AI gateway client.
#[derive(Clone)]
pub struct GatewayClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl CompletionBackend for GatewayClient {
    fn name(&self) -> &str {
        "gateway"
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<mpsc::Receiver<Result<Bytes, ApiError>>, ApiError> {
        // Configuration failure is fatal for the turn, before any network call.
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ApiError::Internal("LLM_API_KEY is not configured".to_string()))?;

        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        let status = response.status();
        if !status.is_success() {
            let upstream_body = response.text().await.unwrap_or_default();
            tracing::error!("AI gateway error: {} {}", status, upstream_body);

            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited(
                    "Rate limits exceeded, please try again later.".to_string(),
                ),
                StatusCode::PAYMENT_REQUIRED => ApiError::PaymentRequired(
                    "Payment required, please add funds to your workspace.".to_string(),
                ),
                // Upstream body stays in the log, not in the response.
                _ => ApiError::Internal("AI gateway error".to_string()),
            });
        }

        let (tx, rx) = mpsc::channel(32);
        let mut stream = response.bytes_stream();

        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        if tx.send(Ok(bytes)).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(ApiError::internal(err))).await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}
