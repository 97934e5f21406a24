//! Message and usage types for chat sessions
//!
//! Defines the conversation message shape shared by the session driver,
//! the local conversation cache, and the request body sent to the
//! completion endpoint (which expects camelCase wire names).

use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the user
    User,
    /// Message produced by the assistant
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single conversation message
///
/// Assistant messages are mutable while a stream is in flight (content
/// grows by appended deltas) and frozen once the stream terminates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender role
    pub role: Role,
    /// Message text
    pub content: String,
    /// Side-channel metadata; only ever present on assistant messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl ChatMessage {
    /// Creates a user message
    ///
    /// # Examples
    ///
    /// ```
    /// use chatledger::session::{ChatMessage, Role};
    ///
    /// let msg = ChatMessage::user("Hello!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            metadata: None,
        }
    }

    /// Creates an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            metadata: None,
        }
    }
}

/// Side-channel metadata attached to a finished assistant message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Names of tools the endpoint executed while producing the message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub executed_tools: Vec<String>,
    /// Per-model token accounting reported by the endpoint
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usage_breakdown: Vec<ModelUsage>,
}

impl MessageMetadata {
    /// Returns true when neither tools nor usage rows are present
    pub fn is_empty(&self) -> bool {
        self.executed_tools.is_empty() && self.usage_breakdown.is_empty()
    }
}

/// Token accounting for one model within a single completion
///
/// The endpoint reports `total_tokens` alongside the two components; the
/// components are authoritative and `normalize` recomputes the total when
/// the reported figure disagrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    /// Model identifier (e.g. "llama-3.1-8b-instant")
    pub model: String,
    /// Tokens consumed by the prompt
    pub prompt_tokens: u64,
    /// Tokens produced by the completion
    pub completion_tokens: u64,
    /// Total tokens (prompt + completion)
    pub total_tokens: u64,
    /// Seconds spent queued, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_time: Option<f64>,
    /// Seconds spent processing the prompt, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_time: Option<f64>,
    /// Seconds spent generating, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<f64>,
    /// Total wall-clock seconds, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<f64>,
}

impl ModelUsage {
    /// Create a usage row with a consistent total
    ///
    /// # Examples
    ///
    /// ```
    /// use chatledger::session::ModelUsage;
    ///
    /// let usage = ModelUsage::new("llama-3.1-8b-instant", 100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(model: impl Into<String>, prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            model: model.into(),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            queue_time: None,
            prompt_time: None,
            completion_time: None,
            total_time: None,
        }
    }

    /// Enforce `total_tokens == prompt_tokens + completion_tokens`
    ///
    /// Endpoints are not guaranteed to report a consistent total. A
    /// mismatch is not fatal: the total is recomputed from the components
    /// and a warning is logged.
    pub fn normalize(mut self) -> Self {
        let expected = self.prompt_tokens + self.completion_tokens;
        if self.total_tokens != expected {
            tracing::warn!(
                model = %self.model,
                reported = self.total_tokens,
                expected,
                "usage row total does not match prompt + completion; recomputing"
            );
            self.total_tokens = expected;
        }
        self
    }
}
