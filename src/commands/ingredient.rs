use clap::{Args, Subcommand};

use super::{confirm, find_ingredient, find_recipe, truncate, CommandResult, OutputFormat};
use recipe_catalog::{Catalog, IngredientPatch, NewIngredient};

#[derive(Args)]
pub struct IngredientCommand {
    #[command(subcommand)]
    pub command: IngredientSubcommand,
}

#[derive(Subcommand)]
pub enum IngredientSubcommand {
    /// Add a new ingredient
    Add {
        /// Ingredient name (must be unique)
        name: String,
    },

    /// List all ingredients
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show an ingredient and the recipes using it
    Show {
        /// Ingredient ID (UUID) or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Rename an ingredient or replace the recipes using it
    Update {
        /// Ingredient ID (UUID) or name
        identifier: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// Recipe that uses this ingredient (can be repeated; replaces the current set)
        #[arg(long = "recipe", value_name = "RECIPE")]
        recipes: Vec<String>,

        /// Remove this ingredient from every recipe
        #[arg(long, conflicts_with = "recipes")]
        clear_recipes: bool,
    },

    /// Delete an ingredient (recipes using it are kept)
    Delete {
        /// Ingredient ID (UUID) or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl IngredientCommand {
    pub async fn run(&self, catalog: &Catalog) -> CommandResult {
        match &self.command {
            IngredientSubcommand::Add { name } => {
                let ingredient = catalog
                    .add_ingredient(NewIngredient { name: name.clone() })
                    .await?;
                println!("Created ingredient:");
                println!("{}", ingredient);
                Ok(())
            }

            IngredientSubcommand::List { format } => {
                let ingredients = catalog.ingredients().await;

                if ingredients.is_empty() {
                    println!("No ingredients found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&ingredients)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<30}  RECIPES", "ID", "NAME");
                        println!("{}", "-".repeat(80));
                        for ingredient in &ingredients {
                            println!(
                                "{:<36}  {:<30}  {}",
                                ingredient.id,
                                truncate(&ingredient.name, 30),
                                ingredient.recipe_ids.len()
                            );
                        }
                        println!("\nTotal: {} ingredient(s)", ingredients.len());
                    }
                }
                Ok(())
            }

            IngredientSubcommand::Show { identifier, format } => {
                let ingredient = find_ingredient(catalog, identifier).await?;
                let view = catalog.ingredient(ingredient.id).await?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&view)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", view.ingredient);
                        for recipe in &view.recipes {
                            println!("  - {} ({})", recipe.title, recipe.id);
                        }
                    }
                }
                Ok(())
            }

            IngredientSubcommand::Update {
                identifier,
                name,
                recipes,
                clear_recipes,
            } => {
                let recipe_ids = if *clear_recipes {
                    Some(Vec::new())
                } else if recipes.is_empty() {
                    None
                } else {
                    let mut ids = Vec::with_capacity(recipes.len());
                    for recipe in recipes {
                        ids.push(find_recipe(catalog, recipe).await?.id);
                    }
                    Some(ids)
                };

                let patch = IngredientPatch {
                    name: name.clone(),
                    recipe_ids,
                };
                if patch.is_empty() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let ingredient = find_ingredient(catalog, identifier).await?;
                let updated = catalog.update_ingredient(ingredient.id, patch).await?;
                println!("Updated ingredient:");
                println!("{}", updated);
                Ok(())
            }

            IngredientSubcommand::Delete { identifier, force } => {
                let ingredient = find_ingredient(catalog, identifier).await?;

                // Confirm deletion unless --force is used
                if !force {
                    let prompt = format!(
                        "Delete ingredient '{}'? It will be removed from {} recipe(s).",
                        ingredient.name,
                        ingredient.recipe_ids.len()
                    );
                    if !confirm(&prompt)? {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                let deleted = catalog.delete_ingredient(ingredient.id).await?;
                println!("Deleted ingredient: {}", deleted.name);
                Ok(())
            }
        }
    }
}
