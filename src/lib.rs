//! chatledger - Streaming chat CLI with usage and cost bookkeeping
//!
//! This library provides the core functionality for chatledger: a
//! streaming chat client that decodes `data:`-framed server responses,
//! accumulates assistant replies delta by delta, and keeps a persistent
//! ledger of message counts, token usage, and estimated cost.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `client`: Completion request, HTTP backend, and stream decoding
//! - `session`: Messages, the in-flight accumulator, and the turn driver
//! - `ledger`: Usage statistics accumulation and the persistence seam
//! - `pricing`: Compiled-in price table and token/cost estimation
//! - `storage`: SQLite persistence for stats and cached conversations
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use chatledger::cli::Cli;
//! use chatledger::config::Config;
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = Cli::parse_from(["chatledger", "usage", "show"]);
//!     let config = Config::load("config.yaml", &cli)?;
//!     config.validate()?;
//!
//!     // Session usage would go here
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod ledger;
pub mod pricing;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use client::{CompletionBackend, CompletionClient, StreamDecoder, StreamRecord};
pub use config::Config;
pub use error::{ChatLedgerError, Result};
pub use ledger::{StatsStore, UsageLedger, UsageStats};
pub use session::{ChatMessage, ChatSession, Conversation, MessageAccumulator, Role};
