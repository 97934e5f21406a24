//! Conversation history commands

use crate::cli::HistoryCommand;
use crate::error::Result;
use crate::session::Role;
use crate::storage::SqliteStore;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle history commands
pub fn handle_history(command: HistoryCommand, store: SqliteStore) -> Result<()> {
    match command {
        HistoryCommand::List => {
            let conversations = store.list_conversations()?;

            if conversations.is_empty() {
                println!("{}", "No cached conversations.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(prettytable::row![
                "ID".bold(),
                "Title".bold(),
                "Model".bold(),
                "Messages".bold(),
                "Last Updated".bold()
            ]);

            for convo in conversations {
                let id_short = convo.id.chars().take(8).collect::<String>();
                let title = if convo.title.chars().count() > 40 {
                    let head: String = convo.title.chars().take(37).collect();
                    format!("{}...", head)
                } else {
                    convo.title
                };
                let model = convo.model.unwrap_or_else(|| "-".to_string());
                let updated = convo.updated_at.format("%Y-%m-%d %H:%M").to_string();

                table.add_row(prettytable::row![
                    id_short.cyan(),
                    title,
                    model,
                    convo.message_count,
                    updated
                ]);
            }

            println!("\nCached Conversations:");
            table.printstd();
            println!();
            println!(
                "Use {} to resume one.",
                "chatledger chat --resume <ID>".cyan()
            );
            println!();
        }
        HistoryCommand::Show { id } => match store.load_conversation(&id)? {
            Some((full_id, title, model, messages)) => {
                println!("\n{} ({})", title.bold(), full_id.dimmed());
                if let Some(model) = model {
                    println!("Model: {}\n", model.cyan());
                } else {
                    println!();
                }

                for message in messages {
                    let label = match message.role {
                        Role::User => "user".green(),
                        Role::Assistant => "assistant".blue(),
                    };
                    println!("{}: {}\n", label, message.content);
                }
            }
            None => {
                println!("{}", format!("No conversation matching {}", id).yellow());
            }
        },
        HistoryCommand::Delete { id } => {
            store.delete_conversation(&id)?;
            println!("{}", format!("Deleted conversation {}", id).green());
        }
    }

    Ok(())
}
