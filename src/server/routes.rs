use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use super::extract::{IdPath, JsonBody};
use crate::catalog::{AuthorView, Catalog, IngredientView, RecipeView};
use crate::error::CatalogError;
use crate::models::{
    Author, AuthorPatch, Ingredient, IngredientPatch, NewAuthor, NewIngredient, NewRecipe, Recipe,
    RecipePatch,
};

pub type SharedCatalog = Arc<Catalog>;

type ApiResult<T> = Result<Json<T>, CatalogError>;
type Created<T> = Result<(StatusCode, Json<T>), CatalogError>;

/// Builds the API router over a shared catalog.
pub fn router(catalog: SharedCatalog) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/{id}",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route("/authors", get(list_authors).post(create_author))
        .route(
            "/authors/{id}",
            get(get_author).patch(update_author).delete(delete_author),
        )
        .route("/authors/{id}/recipes", get(author_recipes))
        .route("/ingredients", get(list_ingredients).post(create_ingredient))
        .route(
            "/ingredients/{id}",
            get(get_ingredient)
                .patch(update_ingredient)
                .delete(delete_ingredient),
        )
        .route("/ingredients/{id}/recipes", get(ingredient_recipes))
        .with_state(catalog)
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    backend: &'static str,
}

async fn health(State(catalog): State<SharedCatalog>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: catalog.backend_name(),
    })
}

// Recipes

async fn list_recipes(State(catalog): State<SharedCatalog>) -> Json<Vec<Recipe>> {
    Json(catalog.recipes().await)
}

async fn get_recipe(
    State(catalog): State<SharedCatalog>,
    IdPath(id): IdPath,
) -> ApiResult<RecipeView> {
    Ok(Json(catalog.recipe(id).await?))
}

async fn create_recipe(
    State(catalog): State<SharedCatalog>,
    JsonBody(input): JsonBody<NewRecipe>,
) -> Created<Recipe> {
    let recipe = catalog.add_recipe(input).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn update_recipe(
    State(catalog): State<SharedCatalog>,
    IdPath(id): IdPath,
    JsonBody(patch): JsonBody<RecipePatch>,
) -> ApiResult<Recipe> {
    Ok(Json(catalog.update_recipe(id, patch).await?))
}

async fn delete_recipe(
    State(catalog): State<SharedCatalog>,
    IdPath(id): IdPath,
) -> ApiResult<Recipe> {
    Ok(Json(catalog.delete_recipe(id).await?))
}

// Authors

async fn list_authors(State(catalog): State<SharedCatalog>) -> Json<Vec<Author>> {
    Json(catalog.authors().await)
}

async fn get_author(
    State(catalog): State<SharedCatalog>,
    IdPath(id): IdPath,
) -> ApiResult<AuthorView> {
    Ok(Json(catalog.author(id).await?))
}

async fn author_recipes(
    State(catalog): State<SharedCatalog>,
    IdPath(id): IdPath,
) -> ApiResult<Vec<Recipe>> {
    Ok(Json(catalog.recipes_from_author(id).await?))
}

async fn create_author(
    State(catalog): State<SharedCatalog>,
    JsonBody(input): JsonBody<NewAuthor>,
) -> Created<Author> {
    let author = catalog.add_author(input).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

async fn update_author(
    State(catalog): State<SharedCatalog>,
    IdPath(id): IdPath,
    JsonBody(patch): JsonBody<AuthorPatch>,
) -> ApiResult<Author> {
    Ok(Json(catalog.update_author(id, patch).await?))
}

async fn delete_author(
    State(catalog): State<SharedCatalog>,
    IdPath(id): IdPath,
) -> ApiResult<Author> {
    Ok(Json(catalog.delete_author(id).await?))
}

// Ingredients

async fn list_ingredients(State(catalog): State<SharedCatalog>) -> Json<Vec<Ingredient>> {
    Json(catalog.ingredients().await)
}

async fn get_ingredient(
    State(catalog): State<SharedCatalog>,
    IdPath(id): IdPath,
) -> ApiResult<IngredientView> {
    Ok(Json(catalog.ingredient(id).await?))
}

async fn ingredient_recipes(
    State(catalog): State<SharedCatalog>,
    IdPath(id): IdPath,
) -> ApiResult<Vec<Recipe>> {
    Ok(Json(catalog.recipes_with_ingredient(id).await?))
}

async fn create_ingredient(
    State(catalog): State<SharedCatalog>,
    JsonBody(input): JsonBody<NewIngredient>,
) -> Created<Ingredient> {
    let ingredient = catalog.add_ingredient(input).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

async fn update_ingredient(
    State(catalog): State<SharedCatalog>,
    IdPath(id): IdPath,
    JsonBody(patch): JsonBody<IngredientPatch>,
) -> ApiResult<Ingredient> {
    Ok(Json(catalog.update_ingredient(id, patch).await?))
}

async fn delete_ingredient(
    State(catalog): State<SharedCatalog>,
    IdPath(id): IdPath,
) -> ApiResult<Ingredient> {
    Ok(Json(catalog.delete_ingredient(id).await?))
}
