use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::RecipeRefs;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    /// Recipes using this ingredient.
    #[serde(default)]
    pub recipe_ids: Vec<Uuid>,
}

impl Ingredient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            recipe_ids: Vec::new(),
        }
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }
}

impl RecipeRefs for Ingredient {
    fn recipe_ids(&self) -> &[Uuid] {
        &self.recipe_ids
    }

    fn recipe_ids_mut(&mut self) -> &mut Vec<Uuid> {
        &mut self.recipe_ids
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} recipe(s))", self.name, self.recipe_ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_name_case_insensitive() {
        let ingredient = Ingredient::new("Tomato");
        assert!(ingredient.has_name("tomato"));
        assert!(ingredient.has_name("TOMATO "));
        assert!(!ingredient.has_name("tomatoes"));
    }

    #[test]
    fn test_ingredient_display() {
        let mut ingredient = Ingredient::new("Cheese");
        ingredient.recipe_ids.push(Uuid::new_v4());
        assert_eq!(format!("{}", ingredient), "Cheese (1 recipe(s))");
    }
}
