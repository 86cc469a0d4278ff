//! Read-only traversal of cross-references.

use serde::Serialize;
use uuid::Uuid;

use crate::error::CatalogResult;
use crate::models::{Author, Ingredient, Recipe, RecipeRefs};
use crate::store::Tables;

pub fn author_of<'a>(tables: &'a Tables, recipe: &Recipe) -> CatalogResult<&'a Author> {
    tables.require(recipe.author_id)
}

pub fn ingredients_of<'a>(tables: &'a Tables, recipe: &Recipe) -> CatalogResult<Vec<&'a Ingredient>> {
    recipe
        .ingredient_ids
        .iter()
        .map(|id| tables.require::<Ingredient>(*id))
        .collect()
}

/// Resolves an author's or ingredient's back-references, in list order.
pub fn recipes_of<'a, O: RecipeRefs>(tables: &'a Tables, owner: &O) -> CatalogResult<Vec<&'a Recipe>> {
    owner
        .recipe_ids()
        .iter()
        .map(|id| tables.require::<Recipe>(*id))
        .collect()
}

pub fn recipes_by_author(tables: &Tables, author_id: Uuid) -> CatalogResult<Vec<&Recipe>> {
    let author = tables.require::<Author>(author_id)?;
    recipes_of(tables, author)
}

pub fn recipes_by_ingredient(tables: &Tables, ingredient_id: Uuid) -> CatalogResult<Vec<&Recipe>> {
    let ingredient = tables.require::<Ingredient>(ingredient_id)?;
    recipes_of(tables, ingredient)
}

/// A recipe with its author and ingredients resolved.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub author: Author,
    pub ingredients: Vec<Ingredient>,
}

impl RecipeView {
    pub fn resolve(tables: &Tables, recipe: &Recipe) -> CatalogResult<Self> {
        Ok(Self {
            recipe: recipe.clone(),
            author: author_of(tables, recipe)?.clone(),
            ingredients: ingredients_of(tables, recipe)?.into_iter().cloned().collect(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorView {
    #[serde(flatten)]
    pub author: Author,
    pub recipes: Vec<Recipe>,
}

impl AuthorView {
    pub fn resolve(tables: &Tables, author: &Author) -> CatalogResult<Self> {
        Ok(Self {
            author: author.clone(),
            recipes: recipes_of(tables, author)?.into_iter().cloned().collect(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngredientView {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub recipes: Vec<Recipe>,
}

impl IngredientView {
    pub fn resolve(tables: &Tables, ingredient: &Ingredient) -> CatalogResult<Self> {
        Ok(Self {
            ingredient: ingredient.clone(),
            recipes: recipes_of(tables, ingredient)?.into_iter().cloned().collect(),
        })
    }
}

/// Oldest first; ties broken by id so the order is stable.
pub fn sort_recipes(recipes: &mut [Recipe]) {
    recipes.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
}

pub fn sort_authors(authors: &mut [Author]) {
    authors.sort_by_cached_key(|a| (a.name.to_lowercase(), a.id));
}

pub fn sort_ingredients(ingredients: &mut [Ingredient]) {
    ingredients.sort_by_cached_key(|i| (i.name.to_lowercase(), i.id));
}
