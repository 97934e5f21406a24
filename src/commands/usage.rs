//! Usage statistics commands

use crate::cli::UsageCommand;
use crate::config::Config;
use crate::error::Result;
use crate::ledger::UsageLedger;
use crate::storage::SqliteStore;
use colored::Colorize;
use prettytable::{format, Table};
use std::io::{BufRead, Write};

/// Handle usage commands
pub fn handle_usage(command: UsageCommand, config: &Config, store: SqliteStore) -> Result<()> {
    let mut ledger = UsageLedger::load(Box::new(store), &config.usage)?;

    match command {
        UsageCommand::Show => {
            print_stats(&ledger);
        }
        UsageCommand::Reset { yes } => {
            if !yes && !confirm_reset(&mut std::io::stdin().lock(), &mut std::io::stdout())? {
                println!("Reset aborted.");
                return Ok(());
            }
            ledger.reset()?;
            println!("{}", "Usage statistics reset.".green());
        }
    }

    Ok(())
}

fn print_stats(ledger: &UsageLedger) {
    let stats = ledger.stats();

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row!["Total messages", stats.total_messages]);
    table.add_row(prettytable::row!["User messages", stats.user_messages]);
    table.add_row(prettytable::row!["Assistant messages", stats.ai_messages]);
    table.add_row(prettytable::row!["Total tokens", stats.total_tokens]);
    table.add_row(prettytable::row![
        "Estimated cost",
        format!("${:.6}", stats.estimated_cost)
    ]);

    println!("\nUsage Statistics:");
    table.printstd();

    if !stats.models_used.is_empty() {
        let mut models = Table::new();
        models.set_format(*format::consts::FORMAT_BORDERS_ONLY);
        models.add_row(prettytable::row!["Model".bold(), "Messages".bold()]);

        let mut rows: Vec<_> = stats.models_used.iter().collect();
        rows.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (model, count) in rows {
            models.add_row(prettytable::row![model.cyan(), count]);
        }

        println!("\nModels Used:");
        models.printstd();
    }
    println!();
}

/// Ask for confirmation on stdin; anything but "y"/"yes" declines
fn confirm_reset<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<bool> {
    write!(output, "Reset all usage statistics? [y/N] ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
