//! Completion stream decoder
//!
//! The completion endpoint responds with a line-framed stream: each line is
//! blank or `data: <payload>`, where the payload is a JSON object or the
//! literal sentinel `[DONE]`. This module turns the raw byte stream into a
//! finite sequence of [`StreamRecord`]s.
//!
//! Malformed JSON payloads are skipped rather than treated as errors. The
//! leniency is deliberate, but not silent: skipped lines are counted on the
//! decoder, logged at debug level, and reflected in the
//! `stream_records_skipped_total` metric so stream corruption is detectable.

use crate::error::Result;
use crate::session::{MessageMetadata, ModelUsage};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use metrics::increment_counter;
use serde::Deserialize;
use tokio::sync::mpsc;

/// Literal payload that terminates the stream
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded record from the completion stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRecord {
    /// An incremental fragment of assistant text
    ContentDelta(String),
    /// Side-channel metadata (executed tools, per-model usage)
    Metadata(MessageMetadata),
}

/// Wire shape of one `data:` payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamPayload {
    content: Option<String>,
    metadata: Option<WireMetadata>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireMetadata {
    #[serde(default)]
    executed_tools: Vec<String>,
    #[serde(default)]
    usage_breakdown: Option<WireUsageBreakdown>,
}

#[derive(Debug, Deserialize, Default)]
struct WireUsageBreakdown {
    #[serde(default)]
    models: Vec<WireModelUsage>,
}

#[derive(Debug, Deserialize)]
struct WireModelUsage {
    model: String,
    usage: WireUsage,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
    queue_time: Option<f64>,
    prompt_time: Option<f64>,
    completion_time: Option<f64>,
    total_time: Option<f64>,
}

impl From<WireMetadata> for MessageMetadata {
    fn from(wire: WireMetadata) -> Self {
        let usage_breakdown = wire
            .usage_breakdown
            .unwrap_or_default()
            .models
            .into_iter()
            .map(|row| {
                ModelUsage {
                    model: row.model,
                    prompt_tokens: row.usage.prompt_tokens,
                    completion_tokens: row.usage.completion_tokens,
                    total_tokens: row.usage.total_tokens,
                    queue_time: row.usage.queue_time,
                    prompt_time: row.usage.prompt_time,
                    completion_time: row.usage.completion_time,
                    total_time: row.usage.total_time,
                }
                .normalize()
            })
            .collect();

        Self {
            executed_tools: wire.executed_tools,
            usage_breakdown,
        }
    }
}

/// Incremental decoder for the line-framed completion stream
///
/// Byte chunks are buffered until a full line is available, so records are
/// decoded identically regardless of how the transport splits the payload.
/// The decoder is finite and non-restartable: once the `[DONE]` sentinel is
/// seen, further input is ignored.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: BytesMut,
    done: bool,
    skipped: u64,
}

impl StreamDecoder {
    /// Creates an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning all records completed by it
    ///
    /// # Examples
    ///
    /// ```
    /// use chatledger::client::{StreamDecoder, StreamRecord};
    ///
    /// let mut decoder = StreamDecoder::new();
    /// let records = decoder.push_chunk(b"data: {\"content\":\"Hi\"}\n");
    /// assert_eq!(records, vec![StreamRecord::ContentDelta("Hi".to_string())]);
    /// ```
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<StreamRecord> {
        if self.done {
            return Vec::new();
        }

        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            self.decode_line(&line[..pos], &mut records);
            if self.done {
                break;
            }
        }
        records
    }

    /// Flush the trailing partial line at transport end
    ///
    /// The endpoint terminates lines with `\n`, but a truncated stream may
    /// leave a final unterminated record in the buffer.
    pub fn finish(&mut self) -> Vec<StreamRecord> {
        if self.done || self.buffer.is_empty() {
            return Vec::new();
        }
        let line = self.buffer.split_to(self.buffer.len());
        let mut records = Vec::new();
        self.decode_line(&line, &mut records);
        records
    }

    /// True once the `[DONE]` sentinel has been consumed
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of malformed lines skipped so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Decode a single line, appending any records it yields
    ///
    /// A payload may carry both `content` and `metadata`; each field yields
    /// its own record, content first.
    fn decode_line(&mut self, raw: &[u8], records: &mut Vec<StreamRecord>) {
        let line = match std::str::from_utf8(raw) {
            Ok(s) => s.trim_end_matches('\r'),
            Err(_) => {
                self.record_skip("invalid utf-8");
                return;
            }
        };

        if line.trim().is_empty() {
            return;
        }

        let payload = match line.strip_prefix("data:") {
            Some(value) => value.trim(),
            // Lines without a data: prefix carry no payload.
            None => return,
        };

        if payload == DONE_SENTINEL {
            self.done = true;
            return;
        }

        let parsed: StreamPayload = match serde_json::from_str(payload) {
            Ok(p) => p,
            Err(err) => {
                tracing::debug!(error = %err, "skipping malformed stream record");
                self.record_skip("malformed json");
                return;
            }
        };

        if let Some(text) = parsed.content {
            records.push(StreamRecord::ContentDelta(text));
        }
        if let Some(metadata) = parsed.metadata {
            records.push(StreamRecord::Metadata(metadata.into()));
        }
    }

    fn record_skip(&mut self, reason: &'static str) {
        self.skipped += 1;
        increment_counter!("stream_records_skipped_total", "reason" => reason);
    }
}

/// Drive a decoder over a transport byte stream, forwarding records
///
/// Consumes the stream until the sentinel or transport end, whichever comes
/// first. Intended to be run inside a `tokio::spawn`, with records consumed
/// from the paired receiver.
///
/// # Arguments
///
/// * `byte_stream` - The raw HTTP response body as a stream of byte chunks
/// * `record_tx` - Channel on which decoded records are forwarded
///
/// # Returns
///
/// The count of skipped malformed lines
///
/// # Errors
///
/// A transport-level chunk error is terminal: decoding stops and the error
/// is surfaced to the caller. No retry, no reconnect.
pub async fn decode_stream(
    byte_stream: impl Stream<Item = Result<Bytes>>,
    record_tx: mpsc::UnboundedSender<StreamRecord>,
) -> Result<u64> {
    use futures::StreamExt;

    let mut decoder = StreamDecoder::new();
    tokio::pin!(byte_stream);

    while let Some(chunk_result) = byte_stream.next().await {
        let chunk = chunk_result?;

        for record in decoder.push_chunk(&chunk) {
            // Receiver dropped: the caller went away, stop decoding.
            if record_tx.send(record).is_err() {
                return Ok(decoder.skipped());
            }
        }

        if decoder.is_done() {
            break;
        }
    }

    for record in decoder.finish() {
        let _ = record_tx.send(record);
    }

    Ok(decoder.skipped())
}
