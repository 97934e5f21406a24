//! HTTP client for the chat-completion endpoint
//!
//! The endpoint accepts a POST with a JSON body (camelCase field names) and
//! answers with a line-framed `data:` stream terminated by `[DONE]`. A
//! non-2xx status fails the whole request; there is no richer error
//! envelope to decode.

use crate::config::ApiConfig;
use crate::error::{ChatLedgerError, Result};
use crate::session::ChatMessage;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;
use std::time::Duration;

/// Byte stream of the completion response body
///
/// Chunk errors are already converted to [`ChatLedgerError::Transport`] by
/// the backend, so consumers never see transport-library error types.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Request body for the completion endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    /// The new user message
    pub message: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum completion tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Optional system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Whether the endpoint may execute tools
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_tools: Option<bool>,
    /// Prior messages of the conversation
    pub conversation_history: Vec<ChatMessage>,
}

impl CompletionRequest {
    /// Build a request from the configured defaults and the new message
    ///
    /// # Arguments
    ///
    /// * `api` - Endpoint configuration providing model and sampling defaults
    /// * `message` - The new user message
    /// * `history` - Conversation history to send along
    pub fn from_config(api: &ApiConfig, message: impl Into<String>, history: Vec<ChatMessage>) -> Self {
        Self {
            message: message.into(),
            model: api.model.clone(),
            temperature: Some(api.temperature),
            max_tokens: Some(api.max_tokens),
            system_prompt: api.system_prompt.clone(),
            enable_tools: Some(api.enable_tools),
            conversation_history: history,
        }
    }
}

/// Backend capable of opening a completion stream
///
/// The session driver talks to this trait rather than to `reqwest`
/// directly, which keeps turn logic testable with scripted streams.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Open a completion stream for the given request
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure or a non-2xx status; the
    /// whole request is considered failed in either case.
    async fn stream_completion(&self, request: &CompletionRequest) -> Result<ByteStream>;
}

/// HTTP completion client
///
/// Owns a `reqwest::Client` and the endpoint URL. One instance is shared
/// for the lifetime of a chat session.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl CompletionClient {
    /// Create a client for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_seconds))
            .build()
            .map_err(|e| ChatLedgerError::Transport(format!("failed to build client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: api.endpoint.clone(),
        })
    }

    /// The endpoint URL this client posts to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn stream_completion(&self, request: &CompletionRequest) -> Result<ByteStream> {
        use futures::StreamExt;

        tracing::debug!(endpoint = %self.endpoint, model = %request.model, "posting completion request");

        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatLedgerError::Transport(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChatLedgerError::CompletionStatus {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| ChatLedgerError::Transport(format!("stream read failed: {}", e)).into())
        });

        Ok(stream.boxed())
    }
}
