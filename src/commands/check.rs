use clap::Args;

use super::{CommandResult, OutputFormat};
use recipe_catalog::Catalog;

#[derive(Args)]
pub struct CheckCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl CheckCommand {
    /// Reports broken references. Fails if any are found.
    pub async fn run(&self, catalog: &Catalog) -> CommandResult {
        let violations = catalog.integrity_report().await;

        match self.format {
            OutputFormat::Json => {
                let messages: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
                println!("{}", serde_json::to_string_pretty(&messages)?);
            }
            OutputFormat::Text => {
                if violations.is_empty() {
                    println!("Catalog is consistent");
                } else {
                    for violation in &violations {
                        println!("  - {}", violation);
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(format!("{} integrity violation(s) found", violations.len()).into())
        }
    }
}
