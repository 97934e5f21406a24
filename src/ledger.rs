//! Persistent usage statistics ledger
//!
//! Accumulates message counts, token totals, and estimated cost across a
//! session, persisting after every update through an injected store. The
//! store is last-write-wins with no cross-process coordination; a single
//! writer is assumed.
//!
//! User messages count toward message totals only. Tokens and cost are
//! accumulated for assistant messages alone, matching the accounting of
//! the backend this client talks to.

use crate::config::UsageConfig;
use crate::error::Result;
use crate::pricing::{estimate_cost, estimate_tokens_from_chars};
use crate::session::ChatMessage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Accumulated usage statistics for a session
///
/// Invariant: `total_messages == user_messages + ai_messages` after any
/// sequence of record calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// All recorded messages
    pub total_messages: u64,
    /// Messages typed by the user
    pub user_messages: u64,
    /// Messages produced by the assistant
    pub ai_messages: u64,
    /// Running token total across assistant messages
    pub total_tokens: u64,
    /// Running estimated cost in USD
    pub estimated_cost: f64,
    /// Per-model usage counts (model identifier to message count)
    #[serde(default)]
    pub models_used: HashMap<String, u64>,
}

/// Persistence seam for [`UsageStats`]
///
/// Injected rather than global so tests can substitute an in-memory
/// double and the application can own exactly one writer.
pub trait StatsStore: Send {
    /// Load previously persisted stats, if any
    fn load(&self) -> Result<Option<UsageStats>>;

    /// Persist the full stats structure (last write wins)
    fn save(&self, stats: &UsageStats) -> Result<()>;
}

/// Usage ledger combining stats, pricing, and a persistence store
pub struct UsageLedger {
    stats: UsageStats,
    store: Box<dyn StatsStore>,
    prefer_authoritative_usage: bool,
    chars_per_token: usize,
}

impl UsageLedger {
    /// Create a ledger, loading persisted stats from the store
    ///
    /// Missing persisted state starts the ledger at zero.
    pub fn load(store: Box<dyn StatsStore>, usage: &UsageConfig) -> Result<Self> {
        let stats = store.load()?.unwrap_or_default();
        Ok(Self {
            stats,
            store,
            prefer_authoritative_usage: usage.prefer_authoritative_usage,
            chars_per_token: usage.chars_per_token,
        })
    }

    /// Current statistics
    pub fn stats(&self) -> &UsageStats {
        &self.stats
    }

    /// Record a user message
    ///
    /// Increments the message counters only. User-side tokens are not
    /// counted and do not contribute to the cost total.
    pub fn record_user_message(&mut self, _text: &str) -> Result<()> {
        self.stats.user_messages += 1;
        self.stats.total_messages += 1;
        self.store.save(&self.stats)
    }

    /// Record a completed assistant message
    ///
    /// Token and cost accumulation prefers the authoritative usage rows
    /// attached to the message. The character heuristic is a fallback for
    /// turns where no usage breakdown arrived (estimating completion
    /// tokens only, since the prompt size is unknown); the two sources are
    /// never blended within one message.
    ///
    /// # Arguments
    ///
    /// * `message` - The finalized assistant message
    /// * `model` - Model the request was sent to (used for the per-model
    ///   count and as the pricing fallback)
    pub fn record_ai_message(&mut self, message: &ChatMessage, model: &str) -> Result<()> {
        self.stats.ai_messages += 1;
        self.stats.total_messages += 1;
        *self.stats.models_used.entry(model.to_string()).or_insert(0) += 1;

        let usage_rows = message
            .metadata
            .as_ref()
            .map(|m| m.usage_breakdown.as_slice())
            .unwrap_or(&[]);

        if self.prefer_authoritative_usage && !usage_rows.is_empty() {
            for row in usage_rows {
                self.stats.total_tokens += row.total_tokens;
                self.stats.estimated_cost +=
                    estimate_cost(&row.model, row.prompt_tokens, row.completion_tokens);
            }
        } else {
            let estimated = estimate_tokens_from_chars(&message.content, self.chars_per_token);
            self.stats.total_tokens += estimated;
            self.stats.estimated_cost += estimate_cost(model, 0, estimated);
        }

        metrics::histogram!("chat_tokens_consumed", self.stats.total_tokens as f64);

        self.store.save(&self.stats)
    }

    /// Reset all counters to zero and persist the empty state
    ///
    /// Confirmation is the caller's responsibility; the CLI prompts before
    /// invoking this.
    pub fn reset(&mut self) -> Result<()> {
        tracing::info!("resetting usage statistics");
        self.stats = UsageStats::default();
        self.store.save(&self.stats)
    }
}
