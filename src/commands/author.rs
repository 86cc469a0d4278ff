use clap::{Args, Subcommand};

use super::{confirm, find_author, truncate, CommandResult, OutputFormat};
use recipe_catalog::{AuthorPatch, Catalog, NewAuthor};

#[derive(Args)]
pub struct AuthorCommand {
    #[command(subcommand)]
    pub command: AuthorSubcommand,
}

#[derive(Subcommand)]
pub enum AuthorSubcommand {
    /// Add a new author
    Add {
        /// Author's name
        name: String,

        /// Email address (must be unique)
        #[arg(long)]
        email: String,
    },

    /// List all authors
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show an author and their recipes
    Show {
        /// Author ID (UUID) or email
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update an author's name or email
    Update {
        /// Author ID (UUID) or email
        identifier: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New email
        #[arg(long)]
        email: Option<String>,
    },

    /// Delete an author and all of their recipes
    Delete {
        /// Author ID (UUID) or email
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl AuthorCommand {
    pub async fn run(&self, catalog: &Catalog) -> CommandResult {
        match &self.command {
            AuthorSubcommand::Add { name, email } => {
                let author = catalog
                    .add_author(NewAuthor {
                        name: name.clone(),
                        email: email.clone(),
                    })
                    .await?;
                println!("Created author:");
                println!("{}", author);
                Ok(())
            }

            AuthorSubcommand::List { format } => {
                let authors = catalog.authors().await;

                if authors.is_empty() {
                    println!("No authors found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&authors)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<24}  {:<30}  RECIPES", "ID", "NAME", "EMAIL");
                        println!("{}", "-".repeat(104));
                        for author in &authors {
                            println!(
                                "{:<36}  {:<24}  {:<30}  {}",
                                author.id,
                                truncate(&author.name, 24),
                                truncate(&author.email, 30),
                                author.recipe_ids.len()
                            );
                        }
                        println!("\nTotal: {} author(s)", authors.len());
                    }
                }
                Ok(())
            }

            AuthorSubcommand::Show { identifier, format } => {
                let author = find_author(catalog, identifier).await?;
                let view = catalog.author(author.id).await?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&view)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", view.author);
                        if !view.recipes.is_empty() {
                            println!();
                            for recipe in &view.recipes {
                                println!("  - {} ({})", recipe.title, recipe.id);
                            }
                        }
                    }
                }
                Ok(())
            }

            AuthorSubcommand::Update {
                identifier,
                name,
                email,
            } => {
                let patch = AuthorPatch {
                    name: name.clone(),
                    email: email.clone(),
                };
                if patch.is_empty() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let author = find_author(catalog, identifier).await?;
                let updated = catalog.update_author(author.id, patch).await?;
                println!("Updated author:");
                println!("{}", updated);
                Ok(())
            }

            AuthorSubcommand::Delete { identifier, force } => {
                let author = find_author(catalog, identifier).await?;

                // Confirm deletion unless --force is used
                if !force {
                    let prompt = format!(
                        "Delete author '{}' and their {} recipe(s)?",
                        author.name,
                        author.recipe_ids.len()
                    );
                    if !confirm(&prompt)? {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                let deleted = catalog.delete_author(author.id).await?;
                println!(
                    "Deleted author: {} ({} recipe(s) removed)",
                    deleted.name,
                    deleted.recipe_ids.len()
                );
                Ok(())
            }
        }
    }
}
