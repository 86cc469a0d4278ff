use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{AuthorCommand, CheckCommand, ConfigCommand, IngredientCommand, RecipeCommand};
use recipe_catalog::{Catalog, Config};

#[derive(Parser)]
#[command(name = "recipes")]
#[command(version)]
#[command(about = "Manage a catalog of recipes, authors and ingredients", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage authors
    Author(AuthorCommand),

    /// Manage ingredients
    Ingredient(IngredientCommand),

    /// Manage recipes
    Recipe(RecipeCommand),

    /// Manage configuration
    Config(ConfigCommand),

    /// Check the catalog for broken references
    Check(CheckCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Author(cmd)) => {
            let catalog = Catalog::open(&config).await?;
            cmd.run(&catalog).await?;
        }
        Some(Commands::Ingredient(cmd)) => {
            let catalog = Catalog::open(&config).await?;
            cmd.run(&catalog).await?;
        }
        Some(Commands::Recipe(cmd)) => {
            let catalog = Catalog::open(&config).await?;
            cmd.run(&catalog).await?;
        }
        Some(Commands::Check(cmd)) => {
            let catalog = Catalog::open(&config).await?;
            cmd.run(&catalog).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
