//! Interactive chat command
//!
//! Runs a readline loop that submits each line as one streaming turn.
//! Assistant deltas are printed as they arrive; Ctrl-C during a turn
//! cancels the stream and discards the partial reply. The transcript is
//! written back to the conversation cache after every completed turn.

use crate::client::CompletionClient;
use crate::config::Config;
use crate::error::Result;
use crate::ledger::UsageLedger;
use crate::session::{ChatSession, Conversation, TurnOutcome};
use crate::storage::SqliteStore;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Start an interactive chat session
///
/// # Arguments
///
/// * `config` - Global configuration (consumed)
/// * `store` - Database handle for the ledger and conversation cache
/// * `model` - Optional model override from the command line
/// * `resume` - Optional conversation ID to resume (full UUID or prefix)
pub async fn run_chat(
    mut config: Config,
    store: SqliteStore,
    model: Option<String>,
    resume: Option<String>,
) -> Result<()> {
    tracing::info!("starting interactive chat");

    // Model precedence: command line, then persisted selection, then config.
    if let Some(model) = model {
        config.api.model = model;
    } else if let Some(selected) = store.selected_model()? {
        config.api.model = selected;
    }

    let (conversation_id, conversation) = match resume {
        Some(id) => match store.load_conversation(&id)? {
            Some((full_id, title, _model, messages)) => {
                println!("{}", format!("Resuming \"{}\"", title).cyan());
                (full_id, Conversation::from_messages(&config.chat, messages))
            }
            None => {
                println!("{}", format!("No conversation matching {}", id).yellow());
                return Ok(());
            }
        },
        None => (
            Uuid::new_v4().to_string(),
            Conversation::new(&config.chat),
        ),
    };

    let ledger = UsageLedger::load(Box::new(store.clone()), &config.usage)?;
    let backend = CompletionClient::new(&config.api)?;
    let mut session = ChatSession::new(
        Box::new(backend),
        config.api.clone(),
        conversation,
        ledger,
    );

    let mut rl = DefaultEditor::new()?;

    print_welcome_banner(session.model());

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "exit" || trimmed == "quit" {
                    break;
                }
                if trimmed == "/help" {
                    print_help();
                    continue;
                }
                if trimmed == "/stats" {
                    print_turn_stats(&session);
                    continue;
                }
                if trimmed == "/clear" {
                    session.conversation_mut().clear();
                    println!("{}\n", "Conversation cleared.".yellow());
                    continue;
                }

                rl.add_history_entry(trimmed)?;

                // Ctrl-C during the stream cancels the turn rather than
                // killing the process.
                let cancel = CancellationToken::new();
                let watcher = {
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        if tokio::signal::ctrl_c().await.is_ok() {
                            cancel.cancel();
                        }
                    })
                };

                println!();
                let outcome = session
                    .send_turn(trimmed, cancel, |delta| {
                        print!("{}", delta);
                        let _ = std::io::stdout().flush();
                    })
                    .await;
                watcher.abort();

                match outcome {
                    Ok(TurnOutcome::Completed {
                        message,
                        skipped_records,
                    }) => {
                        println!("\n");
                        print_turn_badges(&message, skipped_records);

                        store.save_conversation(
                            &conversation_id,
                            &session.conversation().title(),
                            Some(session.model()),
                            session.conversation().messages(),
                        )?;
                    }
                    Ok(TurnOutcome::Cancelled) => {
                        println!("\n{}\n", "(cancelled)".yellow());
                    }
                    Err(e) => {
                        eprintln!("\n{}\n", format!("Error: {}", e).red());
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                tracing::error!("readline error: {:?}", err);
                break;
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn print_welcome_banner(model: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║              chatledger - Streaming Chat Session              ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("Model: {}", model.cyan());
    println!("Type '/help' for available commands, 'exit' to quit\n");
}

fn print_help() {
    println!("\nAvailable commands:");
    println!("  /help   - Show this help");
    println!("  /stats  - Show accumulated usage statistics");
    println!("  /clear  - Clear the in-memory conversation");
    println!("  exit    - Leave chat mode (also: quit, Ctrl-D)");
    println!("\nCtrl-C during a reply cancels the stream.\n");
}

fn print_turn_stats(session: &ChatSession) {
    let stats = session.ledger().stats();
    println!("\nMessages: {} ({} user, {} assistant)", stats.total_messages, stats.user_messages, stats.ai_messages);
    println!("Tokens:   {}", stats.total_tokens);
    println!("Cost:     ${:.6}\n", stats.estimated_cost);
}

/// Print the per-turn side channel: executed tools, usage rows, and a
/// note when malformed stream lines were skipped.
fn print_turn_badges(message: &crate::session::ChatMessage, skipped_records: u64) {
    if let Some(meta) = &message.metadata {
        if !meta.executed_tools.is_empty() {
            println!(
                "{}",
                format!("tools: {}", meta.executed_tools.join(", ")).cyan()
            );
        }
        for row in &meta.usage_breakdown {
            println!(
                "{}",
                format!(
                    "usage: {} ({} prompt + {} completion = {} tokens)",
                    row.model, row.prompt_tokens, row.completion_tokens, row.total_tokens
                )
                .dimmed()
            );
        }
    }
    if skipped_records > 0 {
        println!(
            "{}",
            format!("note: skipped {} malformed stream lines", skipped_records).yellow()
        );
    }
    println!();
}
