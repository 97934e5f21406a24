use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary row for a stored conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConversation {
    /// Unique identifier (UUID)
    pub id: String,
    /// Display title derived from the first user message
    pub title: String,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
    /// When the conversation was last written
    pub updated_at: DateTime<Utc>,
    /// Model the conversation was held with
    pub model: Option<String>,
    /// Number of messages in the transcript
    pub message_count: usize,
}
