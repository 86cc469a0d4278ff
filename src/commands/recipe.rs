use clap::{Args, Subcommand};
use uuid::Uuid;

use super::{
    confirm, find_author, find_ingredient, find_recipe, truncate, CommandResult, OutputFormat,
};
use recipe_catalog::{Catalog, NewRecipe, RecipePatch};

#[derive(Args)]
pub struct RecipeCommand {
    #[command(subcommand)]
    pub command: RecipeSubcommand,
}

#[derive(Subcommand)]
pub enum RecipeSubcommand {
    /// Add a new recipe
    Add {
        /// Recipe title
        title: String,

        /// Author ID (UUID) or email
        #[arg(long)]
        author: String,

        /// Description or method
        #[arg(long, default_value = "")]
        description: String,

        /// Ingredient ID (UUID) or name (can be repeated)
        #[arg(long = "ingredient", value_name = "INGREDIENT")]
        ingredients: Vec<String>,
    },

    /// List recipes
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only recipes by this author (ID or email)
        #[arg(long)]
        author: Option<String>,

        /// Only recipes using this ingredient (ID or name)
        #[arg(long)]
        ingredient: Option<String>,
    },

    /// Show a recipe with its author and ingredients
    Show {
        /// Recipe ID (UUID) or title
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update an existing recipe
    Update {
        /// Recipe ID (UUID) or title
        identifier: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// Move the recipe to another author (ID or email)
        #[arg(long)]
        author: Option<String>,

        /// Ingredient ID (UUID) or name (can be repeated; replaces the current list)
        #[arg(long = "ingredient", value_name = "INGREDIENT")]
        ingredients: Vec<String>,

        /// Remove all ingredients from the recipe
        #[arg(long, conflicts_with = "ingredients")]
        clear_ingredients: bool,
    },

    /// Delete a recipe
    Delete {
        /// Recipe ID (UUID) or title
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl RecipeCommand {
    pub async fn run(&self, catalog: &Catalog) -> CommandResult {
        match &self.command {
            RecipeSubcommand::Add {
                title,
                author,
                description,
                ingredients,
            } => {
                let author = find_author(catalog, author).await?;
                let ingredient_ids = ingredient_ids(catalog, ingredients).await?;

                let recipe = catalog
                    .add_recipe(NewRecipe {
                        title: title.clone(),
                        description: description.clone(),
                        author_id: author.id,
                        ingredient_ids,
                    })
                    .await?;
                println!("Created recipe:");
                println!("{}", recipe);
                Ok(())
            }

            RecipeSubcommand::List {
                format,
                author,
                ingredient,
            } => {
                let mut recipes = match author {
                    Some(author) => {
                        let author = find_author(catalog, author).await?;
                        catalog.recipes_from_author(author.id).await?
                    }
                    None => catalog.recipes().await,
                };

                // Filter by ingredient if specified
                if let Some(ingredient) = ingredient {
                    let ingredient = find_ingredient(catalog, ingredient).await?;
                    recipes.retain(|r| r.ingredient_ids.contains(&ingredient.id));
                }

                if recipes.is_empty() {
                    println!("No recipes found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&recipes)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<30}  {:<10}  INGREDIENTS", "ID", "TITLE", "DATE");
                        println!("{}", "-".repeat(94));
                        for recipe in &recipes {
                            println!(
                                "{:<36}  {:<30}  {:<10}  {}",
                                recipe.id,
                                truncate(&recipe.title, 30),
                                recipe.date.format("%Y-%m-%d"),
                                recipe.ingredient_ids.len()
                            );
                        }
                        println!("\nTotal: {} recipe(s)", recipes.len());
                    }
                }
                Ok(())
            }

            RecipeSubcommand::Show { identifier, format } => {
                let recipe = find_recipe(catalog, identifier).await?;
                let view = catalog.recipe(recipe.id).await?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&view)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", view.recipe);
                        println!("Author: {} <{}>", view.author.name, view.author.email);
                        if !view.ingredients.is_empty() {
                            println!("\nIngredients:");
                            for ingredient in &view.ingredients {
                                println!("  - {}", ingredient.name);
                            }
                        }
                    }
                }
                Ok(())
            }

            RecipeSubcommand::Update {
                identifier,
                title,
                description,
                author,
                ingredients,
                clear_ingredients,
            } => {
                let author_id = match author {
                    Some(author) => Some(find_author(catalog, author).await?.id),
                    None => None,
                };
                let ingredient_ids = if *clear_ingredients {
                    Some(Vec::new())
                } else if ingredients.is_empty() {
                    None
                } else {
                    Some(ingredient_ids(catalog, ingredients).await?)
                };

                let patch = RecipePatch {
                    title: title.clone(),
                    description: description.clone(),
                    author_id,
                    ingredient_ids,
                };
                if patch.is_empty() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let recipe = find_recipe(catalog, identifier).await?;
                let updated = catalog.update_recipe(recipe.id, patch).await?;
                println!("Updated recipe:");
                println!("{}", updated);
                Ok(())
            }

            RecipeSubcommand::Delete { identifier, force } => {
                let recipe = find_recipe(catalog, identifier).await?;

                // Confirm deletion unless --force is used
                if !force && !confirm(&format!("Delete recipe '{}'?", recipe.title))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let deleted = catalog.delete_recipe(recipe.id).await?;
                println!("Deleted recipe: {}", deleted.title);
                Ok(())
            }
        }
    }
}

async fn ingredient_ids(catalog: &Catalog, identifiers: &[String]) -> CommandResult<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(identifiers.len());
    for identifier in identifiers {
        ids.push(find_ingredient(catalog, identifier).await?.id);
    }
    Ok(ids)
}
