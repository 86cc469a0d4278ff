use clap::{Args, Subcommand};

use super::{CommandResult, OutputFormat};
use recipe_catalog::{BackendKind, Config};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> CommandResult {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("backend: {}", config.backend.value);
                        println!("  source: {}", config.backend.source);
                        println!();

                        println!(
                            "database_path: {}{}",
                            config.database_path.value.display(),
                            if config.backend.value == BackendKind::Memory {
                                " (unused)"
                            } else {
                                ""
                            }
                        );
                        println!("  source: {}", config.database_path.source);
                        println!();

                        println!("listen: {}", config.listen_addr());
                        println!("  host source: {}", config.host.source);
                        println!("  port source: {}", config.port.source);
                        println!();

                        println!("seed: {}", config.seed.value);
                        println!("  source: {}", config.seed.source);
                        println!();

                        println!(
                            "retry: {} attempt(s), {}ms initial delay, {}ms max delay",
                            config.retry.max_attempts,
                            config.retry.initial_delay_ms,
                            config.retry.max_delay_ms
                        );
                    }
                }
                Ok(())
            }
        }
    }
}
