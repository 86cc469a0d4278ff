mod author;
mod ingredient;
mod input;
mod recipe;

pub use author::Author;
pub use ingredient::Ingredient;
pub use input::{AuthorPatch, IngredientPatch, NewAuthor, NewIngredient, NewRecipe, RecipePatch};
pub use recipe::Recipe;

use std::collections::HashSet;
use uuid::Uuid;

/// Records that keep a back-reference list of recipe ids.
pub trait RecipeRefs {
    fn recipe_ids(&self) -> &[Uuid];
    fn recipe_ids_mut(&mut self) -> &mut Vec<Uuid>;
}

/// Appends `id` unless it is already present.
pub fn attach(ids: &mut Vec<Uuid>, id: Uuid) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

/// Removes every occurrence of `id`. No-op if absent.
pub fn detach(ids: &mut Vec<Uuid>, id: Uuid) {
    ids.retain(|existing| *existing != id);
}

/// Drops repeated ids, keeping the first occurrence of each.
pub fn dedup_ids(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
