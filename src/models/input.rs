//! Arguments accepted by the catalog's mutations.
//!
//! Patch types use `None` for "leave unchanged".

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuthor {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIngredient {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientPatch {
    pub name: Option<String>,
    /// Replaces the set of recipes that use this ingredient.
    pub recipe_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecipe {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub author_id: Uuid,
    #[serde(default)]
    pub ingredient_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author_id: Option<Uuid>,
    pub ingredient_ids: Option<Vec<Uuid>>,
}

impl AuthorPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

impl IngredientPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.recipe_ids.is_none()
    }
}

impl RecipePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.author_id.is_none()
            && self.ingredient_ids.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_recipe_defaults() {
        let json = format!(r#"{{"title":"Pizza","author_id":"{}"}}"#, Uuid::new_v4());
        let input: NewRecipe = serde_json::from_str(&json).unwrap();
        assert_eq!(input.description, "");
        assert!(input.ingredient_ids.is_empty());
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(RecipePatch::default().is_empty());
        assert!(AuthorPatch::default().is_empty());
        assert!(IngredientPatch::default().is_empty());

        let patch = RecipePatch {
            ingredient_ids: Some(Vec::new()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
