//! In-flight assistant message accumulation
//!
//! While a completion stream is open, exactly one assistant message is
//! under construction. Content deltas are appended in arrival order,
//! metadata envelopes are attached without touching the content, and the
//! message is frozen exactly once when the stream terminates.

use crate::error::{ChatLedgerError, Result};
use crate::session::{ChatMessage, MessageMetadata};

/// Accumulates the one in-flight assistant message of a conversation
///
/// `finalize` hands the message out at most once, so a double call cannot
/// double-append it to the conversation list. A cancelled or failed turn
/// calls `discard` instead, dropping whatever partial content arrived.
#[derive(Debug, Default)]
pub struct MessageAccumulator {
    in_flight: Option<ChatMessage>,
}

impl MessageAccumulator {
    /// Creates an accumulator with no message in flight
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new in-flight assistant message
    ///
    /// # Errors
    ///
    /// Returns [`ChatLedgerError::TurnInFlight`] when a message is already
    /// being accumulated; the caller must finalize or discard it first.
    pub fn begin(&mut self) -> Result<()> {
        if self.in_flight.is_some() {
            return Err(ChatLedgerError::TurnInFlight.into());
        }
        self.in_flight = Some(ChatMessage::assistant(""));
        Ok(())
    }

    /// Append a content delta, returning the updated partial content
    ///
    /// The returned slice supports live display of the growing message.
    ///
    /// # Errors
    ///
    /// Returns an error when no message is in flight.
    pub fn apply_delta(&mut self, text: &str) -> Result<&str> {
        let message = self
            .in_flight
            .as_mut()
            .ok_or_else(|| ChatLedgerError::Stream("delta with no message in flight".to_string()))?;
        message.content.push_str(text);
        Ok(message.content.as_str())
    }

    /// Attach a metadata envelope to the in-flight message
    ///
    /// Repeated envelopes merge: tool names append, usage rows append.
    /// Content is never altered.
    ///
    /// # Errors
    ///
    /// Returns an error when no message is in flight.
    pub fn apply_metadata(&mut self, envelope: MessageMetadata) -> Result<()> {
        let message = self.in_flight.as_mut().ok_or_else(|| {
            ChatLedgerError::Stream("metadata with no message in flight".to_string())
        })?;

        let metadata = message.metadata.get_or_insert_with(MessageMetadata::default);
        metadata.executed_tools.extend(envelope.executed_tools);
        metadata.usage_breakdown.extend(envelope.usage_breakdown);
        Ok(())
    }

    /// Freeze and hand out the in-flight message
    ///
    /// Returns `None` when nothing is in flight, which makes a second call
    /// a no-op rather than a duplicate append.
    pub fn finalize(&mut self) -> Option<ChatMessage> {
        self.in_flight.take()
    }

    /// Drop the in-flight message without finalizing it
    ///
    /// Used on cancellation and transport failure: partial content is
    /// discarded, never committed to the conversation.
    pub fn discard(&mut self) {
        if let Some(message) = self.in_flight.take() {
            tracing::debug!(
                partial_chars = message.content.chars().count(),
                "discarding partial assistant message"
            );
        }
    }

    /// True while a message is being accumulated
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Current partial content, when a message is in flight
    pub fn partial_content(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|m| m.content.as_str())
    }
}
