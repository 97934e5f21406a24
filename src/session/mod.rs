//! Chat session management
//!
//! A session drives one turn at a time: the user message is appended to
//! the conversation, a streaming completion request is issued, decoded
//! records are folded into an in-flight assistant message, and the
//! finished message is recorded in the usage ledger. Only one turn may be
//! in flight per session.

pub mod accumulator;
pub mod message;

pub use accumulator::MessageAccumulator;
pub use message::{ChatMessage, MessageMetadata, ModelUsage, Role};

use crate::client::{decode_stream, CompletionBackend, CompletionRequest, StreamRecord};
use crate::config::{ApiConfig, ChatConfig};
use crate::error::{ChatLedgerError, Result};
use crate::ledger::UsageLedger;
use metrics::{histogram, increment_counter};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a chat session
///
/// `Streaming` and `Finalizing` are in-flight states; a new turn is only
/// accepted from `Idle` or `Errored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No turn in flight
    Idle,
    /// A completion stream is being consumed
    Streaming,
    /// The stream has ended and the message is being recorded
    Finalizing,
    /// The previous turn failed; the session is usable again
    Errored,
}

/// Result of a completed turn
#[derive(Debug)]
pub enum TurnOutcome {
    /// The stream ran to completion
    Completed {
        /// The finalized assistant message
        message: ChatMessage,
        /// Malformed stream lines skipped by the decoder
        skipped_records: u64,
    },
    /// The user cancelled mid-stream; partial content was discarded
    Cancelled,
}

/// An ordered message history with a derived title
///
/// Holds the full transcript; requests carry only the most recent window
/// of it (see [`Conversation::history_for_request`]).
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    max_history_messages: usize,
    title_max_chars: usize,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new(chat: &ChatConfig) -> Self {
        Self {
            messages: Vec::new(),
            max_history_messages: chat.max_history_messages,
            title_max_chars: chat.title_max_chars,
        }
    }

    /// Rebuild a conversation from persisted messages
    pub fn from_messages(chat: &ChatConfig, messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_history_messages: chat.max_history_messages,
            title_max_chars: chat.title_max_chars,
        }
    }

    /// Append a message to the transcript
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Full transcript in order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages in the transcript
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when no messages have been exchanged
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop the transcript, keeping configuration
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// The history window sent with the next request
    ///
    /// Returns the most recent `max_history_messages` messages. The new
    /// user message travels in the request's own field, not in this
    /// window.
    pub fn history_for_request(&self) -> Vec<ChatMessage> {
        let start = self.messages.len().saturating_sub(self.max_history_messages);
        self.messages[start..].to_vec()
    }

    /// Derive a display title from the first user message
    ///
    /// Truncated on a character boundary with an ellipsis when the
    /// message is longer than the configured maximum. Falls back to a
    /// fixed label for transcripts with no user message.
    pub fn title(&self) -> String {
        let first = self
            .messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.trim());

        match first {
            Some(text) if !text.is_empty() => {
                if text.chars().count() <= self.title_max_chars {
                    text.to_string()
                } else {
                    let truncated: String = text.chars().take(self.title_max_chars).collect();
                    format!("{}...", truncated.trim_end())
                }
            }
            _ => "New conversation".to_string(),
        }
    }
}

/// Drives chat turns against a completion backend
///
/// Owns the conversation transcript, the in-flight accumulator, and the
/// usage ledger. The backend is a trait object so tests can script the
/// byte stream without a server.
pub struct ChatSession {
    backend: Box<dyn CompletionBackend>,
    api: ApiConfig,
    conversation: Conversation,
    accumulator: MessageAccumulator,
    ledger: UsageLedger,
    state: SessionState,
}

impl ChatSession {
    /// Create a session over a backend
    pub fn new(
        backend: Box<dyn CompletionBackend>,
        api: ApiConfig,
        conversation: Conversation,
        ledger: UsageLedger,
    ) -> Self {
        Self {
            backend,
            api,
            conversation,
            accumulator: MessageAccumulator::new(),
            ledger,
            state: SessionState::Idle,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The conversation transcript
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Mutable transcript access (used when resuming a saved conversation)
    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// The usage ledger
    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    /// Model identifier requests are sent with
    pub fn model(&self) -> &str {
        &self.api.model
    }

    /// Send one user message and stream the reply
    ///
    /// `on_delta` is invoked with each content fragment as it arrives, for
    /// live rendering. Cancelling `cancel` mid-stream discards the partial
    /// assistant message; the user message stays in the transcript.
    ///
    /// # Errors
    ///
    /// Returns [`ChatLedgerError::TurnInFlight`] when called while a turn
    /// is already streaming. Transport and decode failures discard the
    /// partial message and leave the session in the `Errored` state; the
    /// next call starts a fresh turn.
    pub async fn send_turn<F>(
        &mut self,
        text: &str,
        cancel: CancellationToken,
        mut on_delta: F,
    ) -> Result<TurnOutcome>
    where
        F: FnMut(&str),
    {
        if matches!(self.state, SessionState::Streaming | SessionState::Finalizing) {
            return Err(ChatLedgerError::TurnInFlight.into());
        }

        let started = Instant::now();
        let history = self.conversation.history_for_request();
        let request = CompletionRequest::from_config(&self.api, text, history);

        self.conversation.push(ChatMessage::user(text));
        self.ledger.record_user_message(text)?;

        self.accumulator.begin()?;
        self.state = SessionState::Streaming;

        let byte_stream = match self.backend.stream_completion(&request).await {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail_turn(e)),
        };

        let (record_tx, mut record_rx) = mpsc::unbounded_channel();
        let decode_task = tokio::spawn(decode_stream(byte_stream, record_tx));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    decode_task.abort();
                    self.accumulator.discard();
                    self.state = SessionState::Idle;
                    increment_counter!("chat_turns_total", "outcome" => "cancelled");
                    return Ok(TurnOutcome::Cancelled);
                }
                record = record_rx.recv() => {
                    match record {
                        Some(StreamRecord::ContentDelta(delta)) => {
                            if let Err(e) = self.accumulator.apply_delta(&delta) {
                                decode_task.abort();
                                return Err(self.fail_turn(e));
                            }
                            on_delta(&delta);
                        }
                        Some(StreamRecord::Metadata(envelope)) => {
                            if let Err(e) = self.accumulator.apply_metadata(envelope) {
                                decode_task.abort();
                                return Err(self.fail_turn(e));
                            }
                        }
                        // Sender dropped: the decode task is finished.
                        None => break,
                    }
                }
            }
        }

        let skipped_records = match decode_task.await {
            Ok(Ok(skipped)) => skipped,
            Ok(Err(e)) => return Err(self.fail_turn(e)),
            Err(e) => {
                return Err(
                    self.fail_turn(ChatLedgerError::Stream(format!("decode task: {e}")).into())
                )
            }
        };

        self.state = SessionState::Finalizing;

        let message = match self.accumulator.finalize() {
            Some(message) => message,
            None => {
                return Err(self.fail_turn(
                    ChatLedgerError::Stream("stream ended with no message in flight".to_string())
                        .into(),
                ))
            }
        };

        let model = self.api.model.clone();
        self.ledger.record_ai_message(&message, &model)?;
        self.conversation.push(message.clone());

        self.state = SessionState::Idle;
        increment_counter!("chat_turns_total", "outcome" => "completed");
        histogram!(
            "chat_turn_duration_seconds",
            started.elapsed().as_secs_f64()
        );

        Ok(TurnOutcome::Completed {
            message,
            skipped_records,
        })
    }

    /// Discard the partial message and mark the session errored
    fn fail_turn(&mut self, error: anyhow::Error) -> anyhow::Error {
        self.accumulator.discard();
        self.state = SessionState::Errored;
        increment_counter!("chat_turns_total", "outcome" => "errored");
        tracing::warn!(error = %error, "chat turn failed");
        error
    }
}
