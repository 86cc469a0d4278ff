//! Reference maintenance.
//!
//! Every mutation runs against a [`Draft`] and keeps the back-reference
//! lists of authors and ingredients in step with the recipes that point at
//! them. An `Err` from any function here means the draft must be dropped;
//! the store never commits a partially maintained draft.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    attach, dedup_ids, detach, Author, AuthorPatch, Ingredient, IngredientPatch, NewAuthor,
    NewIngredient, NewRecipe, Recipe, RecipePatch, RecipeRefs,
};
use crate::store::{Collection, Draft, Entity};

pub fn add_author(draft: &mut Draft<'_>, input: NewAuthor) -> CatalogResult<Author> {
    let name = required("name", &input.name)?;
    let email = required("email", &input.email)?;
    ensure_email_free(draft, &email, None)?;

    let author = Author::new(name, email);
    draft.insert(author.clone());
    Ok(author)
}

/// Edits the author's own fields. Recipe ownership is changed through
/// [`update_recipe`].
pub fn update_author(draft: &mut Draft<'_>, id: Uuid, patch: AuthorPatch) -> CatalogResult<Author> {
    draft.require::<Author>(id)?;

    let name = patch.name.as_deref().map(|n| required("name", n)).transpose()?;
    let email = patch
        .email
        .as_deref()
        .map(|e| required("email", e))
        .transpose()?;
    if let Some(email) = &email {
        ensure_email_free(draft, email, Some(id))?;
    }

    let author = draft.update::<Author>(id, |author| {
        if let Some(name) = name {
            author.name = name;
        }
        if let Some(email) = email {
            author.email = email;
        }
    })?;
    Ok(author.clone())
}

/// Deletes the author and every recipe it owns.
pub fn delete_author(draft: &mut Draft<'_>, id: Uuid) -> CatalogResult<Author> {
    let author = draft.require::<Author>(id)?.clone();

    for &recipe_id in &author.recipe_ids {
        let owned = draft
            .get::<Recipe>(recipe_id)
            .map(|recipe| recipe.author_id == id);
        match owned {
            Some(true) => {
                delete_recipe(draft, recipe_id)?;
            }
            Some(false) => {
                tracing::warn!(
                    author_id = %id,
                    recipe_id = %recipe_id,
                    "Recipe listed by author belongs to someone else, not deleting it"
                );
            }
            None => {
                tracing::warn!(
                    author_id = %id,
                    recipe_id = %recipe_id,
                    "Skipping dangling recipe reference"
                );
            }
        }
    }

    draft.remove::<Author>(id)?;
    Ok(author)
}

pub fn add_ingredient(draft: &mut Draft<'_>, input: NewIngredient) -> CatalogResult<Ingredient> {
    let name = required("name", &input.name)?;
    ensure_name_free(draft, &name, None)?;

    let ingredient = Ingredient::new(name);
    draft.insert(ingredient.clone());
    Ok(ingredient)
}

/// Renames the ingredient and, when `recipe_ids` is given, replaces the set
/// of recipes using it. Each affected recipe's ingredient list is updated
/// to match.
pub fn update_ingredient(
    draft: &mut Draft<'_>,
    id: Uuid,
    patch: IngredientPatch,
) -> CatalogResult<Ingredient> {
    let current = draft.require::<Ingredient>(id)?.clone();

    let name = patch.name.as_deref().map(|n| required("name", n)).transpose()?;
    if let Some(name) = &name {
        ensure_name_free(draft, name, Some(id))?;
    }

    let recipe_ids = match patch.recipe_ids {
        Some(ids) => {
            let ids = dedup_ids(ids);
            for &recipe_id in &ids {
                draft.require::<Recipe>(recipe_id)?;
            }
            Some(ids)
        }
        None => None,
    };

    if let Some(ids) = &recipe_ids {
        for &recipe_id in current.recipe_ids.iter().filter(|r| !ids.contains(r)) {
            if draft.get::<Recipe>(recipe_id).is_none() {
                tracing::warn!(
                    ingredient_id = %id,
                    recipe_id = %recipe_id,
                    "Skipping dangling recipe reference"
                );
                continue;
            }
            draft.update::<Recipe>(recipe_id, |recipe| detach(&mut recipe.ingredient_ids, id))?;
        }
        for &recipe_id in ids.iter().filter(|r| !current.recipe_ids.contains(r)) {
            draft.update::<Recipe>(recipe_id, |recipe| attach(&mut recipe.ingredient_ids, id))?;
        }
    }

    let ingredient = draft.update::<Ingredient>(id, |ingredient| {
        if let Some(name) = name {
            ingredient.name = name;
        }
        if let Some(ids) = recipe_ids {
            ingredient.recipe_ids = ids;
        }
    })?;
    Ok(ingredient.clone())
}

/// Deletes the ingredient and removes it from every recipe using it. The
/// recipes themselves survive.
pub fn delete_ingredient(draft: &mut Draft<'_>, id: Uuid) -> CatalogResult<Ingredient> {
    let ingredient = draft.require::<Ingredient>(id)?.clone();

    for &recipe_id in &ingredient.recipe_ids {
        if draft.get::<Recipe>(recipe_id).is_none() {
            tracing::warn!(
                ingredient_id = %id,
                recipe_id = %recipe_id,
                "Skipping dangling recipe reference"
            );
            continue;
        }
        draft.update::<Recipe>(recipe_id, |recipe| detach(&mut recipe.ingredient_ids, id))?;
    }

    draft.remove::<Ingredient>(id)?;
    Ok(ingredient)
}

/// Creates a recipe dated `now` and attaches it to its author and
/// ingredients. Repeated ingredient ids are collapsed.
pub fn add_recipe(
    draft: &mut Draft<'_>,
    input: NewRecipe,
    now: DateTime<Utc>,
) -> CatalogResult<Recipe> {
    let title = required("title", &input.title)?;
    draft.require::<Author>(input.author_id)?;
    let ingredient_ids = existing_ingredients(draft, input.ingredient_ids)?;

    let recipe = Recipe::new(title, input.description.trim(), input.author_id, now)
        .with_ingredients(ingredient_ids);

    link::<Author>(draft, recipe.author_id, recipe.id)?;
    for &ingredient_id in &recipe.ingredient_ids {
        link::<Ingredient>(draft, ingredient_id, recipe.id)?;
    }
    draft.insert(recipe.clone());
    Ok(recipe)
}

/// Partial update. Moving a recipe to another author or changing its
/// ingredients moves the back-references with it.
pub fn update_recipe(draft: &mut Draft<'_>, id: Uuid, patch: RecipePatch) -> CatalogResult<Recipe> {
    let current = draft.require::<Recipe>(id)?.clone();

    let title = patch
        .title
        .as_deref()
        .map(|t| required("title", t))
        .transpose()?;
    let description = patch.description.map(|d| d.trim().to_string());

    let new_author = match patch.author_id {
        Some(author_id) if author_id != current.author_id => {
            draft.require::<Author>(author_id)?;
            Some(author_id)
        }
        _ => None,
    };
    let ingredient_ids = match patch.ingredient_ids {
        Some(ids) => Some(existing_ingredients(draft, ids)?),
        None => None,
    };

    if let Some(author_id) = new_author {
        unlink::<Author>(draft, current.author_id, id)?;
        link::<Author>(draft, author_id, id)?;
    }
    if let Some(ids) = &ingredient_ids {
        for &old in current.ingredient_ids.iter().filter(|i| !ids.contains(i)) {
            unlink::<Ingredient>(draft, old, id)?;
        }
        for &new in ids.iter().filter(|i| !current.ingredient_ids.contains(i)) {
            link::<Ingredient>(draft, new, id)?;
        }
    }

    let recipe = draft.update::<Recipe>(id, |recipe| {
        if let Some(title) = title {
            recipe.title = title;
        }
        if let Some(description) = description {
            recipe.description = description;
        }
        if let Some(author_id) = new_author {
            recipe.author_id = author_id;
        }
        if let Some(ids) = ingredient_ids {
            recipe.ingredient_ids = ids;
        }
    })?;
    Ok(recipe.clone())
}

/// Detaches the recipe from its author and ingredients, then removes it.
pub fn delete_recipe(draft: &mut Draft<'_>, id: Uuid) -> CatalogResult<Recipe> {
    let recipe = draft.require::<Recipe>(id)?.clone();

    unlink::<Author>(draft, recipe.author_id, id)?;
    for &ingredient_id in &recipe.ingredient_ids {
        unlink::<Ingredient>(draft, ingredient_id, id)?;
    }

    draft.remove::<Recipe>(id)?;
    Ok(recipe)
}

fn required(field: &str, value: &str) -> CatalogResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::InvalidInput(format!(
            "{} must not be blank",
            field
        )));
    }
    Ok(value.to_string())
}

fn ensure_email_free(draft: &Draft<'_>, email: &str, except: Option<Uuid>) -> CatalogResult<()> {
    let taken = draft
        .iter::<Author>()
        .any(|author| Some(author.id) != except && author.has_email(email));
    if taken {
        return Err(CatalogError::AlreadyExists {
            collection: Collection::Authors,
            field: "email",
            value: email.to_string(),
        });
    }
    Ok(())
}

fn ensure_name_free(draft: &Draft<'_>, name: &str, except: Option<Uuid>) -> CatalogResult<()> {
    let taken = draft
        .iter::<Ingredient>()
        .any(|ingredient| Some(ingredient.id) != except && ingredient.has_name(name));
    if taken {
        return Err(CatalogError::AlreadyExists {
            collection: Collection::Ingredients,
            field: "name",
            value: name.to_string(),
        });
    }
    Ok(())
}

fn existing_ingredients(draft: &Draft<'_>, ids: Vec<Uuid>) -> CatalogResult<Vec<Uuid>> {
    let ids = dedup_ids(ids);
    for &id in &ids {
        draft.require::<Ingredient>(id)?;
    }
    Ok(ids)
}

fn link<E: Entity + RecipeRefs>(draft: &mut Draft<'_>, owner: Uuid, recipe: Uuid) -> CatalogResult<()> {
    draft.update::<E>(owner, |record| attach(record.recipe_ids_mut(), recipe))?;
    Ok(())
}

/// Missing owners are skipped: there is nothing left to detach from.
fn unlink<E: Entity + RecipeRefs>(
    draft: &mut Draft<'_>,
    owner: Uuid,
    recipe: Uuid,
) -> CatalogResult<()> {
    if draft.get::<E>(owner).is_none() {
        tracing::warn!(
            collection = %E::COLLECTION,
            owner_id = %owner,
            recipe_id = %recipe,
            "Skipping back-reference on missing record"
        );
        return Ok(());
    }
    draft.update::<E>(owner, |record| detach(record.recipe_ids_mut(), recipe))?;
    Ok(())
}
