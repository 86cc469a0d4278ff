mod author;
mod check;
mod config_cmd;
mod ingredient;
mod recipe;

pub use author::AuthorCommand;
pub use check::CheckCommand;
pub use config_cmd::ConfigCommand;
pub use ingredient::IngredientCommand;
pub use recipe::RecipeCommand;

use clap::ValueEnum;
use std::io::{self, Write};
use uuid::Uuid;

use recipe_catalog::{Author, Catalog, Ingredient, Recipe};

type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Ask a yes/no question on stdin. Anything but "y" means no.
fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Author by ID (UUID) or email.
async fn find_author(catalog: &Catalog, identifier: &str) -> CommandResult<Author> {
    let author = match Uuid::parse_str(identifier) {
        Ok(id) => catalog.get::<Author>(id).await,
        Err(_) => catalog.author_by_email(identifier).await,
    };
    author.ok_or_else(|| format!("Author not found: {}", identifier).into())
}

/// Ingredient by ID (UUID) or name.
async fn find_ingredient(catalog: &Catalog, identifier: &str) -> CommandResult<Ingredient> {
    let ingredient = match Uuid::parse_str(identifier) {
        Ok(id) => catalog.get::<Ingredient>(id).await,
        Err(_) => catalog.ingredient_by_name(identifier).await,
    };
    ingredient.ok_or_else(|| format!("Ingredient not found: {}", identifier).into())
}

/// Recipe by ID (UUID) or title. Titles are not unique, so a title must
/// match exactly one recipe.
async fn find_recipe(catalog: &Catalog, identifier: &str) -> CommandResult<Recipe> {
    if let Ok(id) = Uuid::parse_str(identifier) {
        return catalog
            .get::<Recipe>(id)
            .await
            .ok_or_else(|| format!("Recipe not found: {}", identifier).into());
    }

    let title = identifier.trim().to_lowercase();
    let mut matches: Vec<Recipe> = catalog
        .recipes()
        .await
        .into_iter()
        .filter(|r| r.title.to_lowercase() == title)
        .collect();

    match matches.len() {
        0 => Err(format!("Recipe not found: {}", identifier).into()),
        1 => Ok(matches.remove(0)),
        n => Err(format!(
            "{} recipes are titled '{}'; use the recipe ID instead",
            n, identifier
        )
        .into()),
    }
}

/// Shorten `text` to `width` characters for table output.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
