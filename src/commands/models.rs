//! Model selection commands
//!
//! Models come from the compiled-in price table rather than a discovery
//! endpoint. `use` persists the selection; unknown identifiers are
//! allowed (their turns are still counted, at zero cost) but flagged.

use crate::cli::ModelCommand;
use crate::config::Config;
use crate::error::Result;
use crate::pricing::{price_for, PRICE_TABLE};
use crate::storage::SqliteStore;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle model commands
pub fn handle_models(command: ModelCommand, config: &Config, store: SqliteStore) -> Result<()> {
    match command {
        ModelCommand::List => {
            let active = store
                .selected_model()?
                .unwrap_or_else(|| config.api.model.clone());

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(prettytable::row![
                "".bold(),
                "Model".bold(),
                "Input $/M".bold(),
                "Output $/M".bold()
            ]);

            for (model, price) in PRICE_TABLE {
                let marker = if *model == active { "*" } else { "" };
                table.add_row(prettytable::row![
                    marker,
                    model.cyan(),
                    format!("{:.2}", price.input_per_million),
                    format!("{:.2}", price.output_per_million)
                ]);
            }

            println!("\nKnown Models (* = active):");
            table.printstd();

            if price_for(&active).is_none() {
                println!(
                    "\n{}",
                    format!(
                        "Active model \"{}\" is not in the price table; its cost is recorded as $0.",
                        active
                    )
                    .yellow()
                );
            }
            println!();
        }
        ModelCommand::Use { model } => {
            if price_for(&model).is_none() {
                println!(
                    "{}",
                    format!(
                        "Warning: \"{}\" is not in the price table; its cost will be recorded as $0.",
                        model
                    )
                    .yellow()
                );
            }
            store.set_selected_model(&model)?;
            println!("{}", format!("Active model set to {}", model).green());
        }
    }

    Ok(())
}
