//! Command-line interface definition for chatledger
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for chat, usage accounting, conversation history,
//! and model selection.

use clap::{Parser, Subcommand};

/// chatledger - Streaming chat CLI with usage and cost bookkeeping
///
/// Talk to a chat-completion endpoint over a streamed response, and keep
/// a persistent ledger of message counts, token usage, and estimated cost.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatledger")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the completion endpoint URL
    #[arg(long, env = "CHATLEDGER_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Override the path of the local database (usage stats and history)
    #[arg(long, env = "CHATLEDGER_DB")]
    pub db_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for chatledger
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Override the model from config
        #[arg(short, long)]
        model: Option<String>,

        /// Resume a cached conversation by ID (full UUID or 8-char prefix)
        #[arg(short, long)]
        resume: Option<String>,
    },

    /// Inspect or reset accumulated usage statistics
    Usage {
        /// Usage subcommand
        #[command(subcommand)]
        command: UsageCommand,
    },

    /// Manage locally cached conversations
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Inspect the price table and select the active model
    Models {
        /// Model subcommand
        #[command(subcommand)]
        command: ModelCommand,
    },
}

/// Usage statistics subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum UsageCommand {
    /// Show accumulated usage statistics
    Show,

    /// Reset all usage statistics to zero
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Conversation history subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List cached conversations
    List,

    /// Print the messages of a cached conversation
    Show {
        /// Conversation ID (full UUID or 8-char prefix)
        id: String,
    },

    /// Delete a cached conversation
    Delete {
        /// Conversation ID (full UUID or 8-char prefix)
        id: String,
    },
}

/// Model selection subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ModelCommand {
    /// List models from the compiled-in price table
    List,

    /// Persist the given model as the active selection
    Use {
        /// Model identifier
        model: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
