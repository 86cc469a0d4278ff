//! Recipe Catalog
//!
//! Authors, ingredients and recipes with cross-references that stay
//! consistent across every mutation, stored in memory or in SQLite.

pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod store;

pub use catalog::{AuthorView, Catalog, IngredientView, RecipeView};
pub use config::{BackendKind, Config, ConfigError, RetryPolicy};
pub use error::{CatalogError, CatalogResult, StorageError};
pub use models::{
    Author, AuthorPatch, Ingredient, IngredientPatch, NewAuthor, NewIngredient, NewRecipe, Recipe,
    RecipePatch,
};
pub use store::{Collection, Violation};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
