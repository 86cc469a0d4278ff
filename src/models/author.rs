use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::RecipeRefs;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Author {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Recipes written by this author, in the order they were attached.
    #[serde(default)]
    pub recipe_ids: Vec<Uuid>,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            recipe_ids: Vec::new(),
        }
    }

    /// Emails are unique regardless of case.
    pub fn has_email(&self, email: &str) -> bool {
        self.email.trim().to_lowercase() == email.trim().to_lowercase()
    }
}

impl RecipeRefs for Author {
    fn recipe_ids(&self) -> &[Uuid] {
        &self.recipe_ids
    }

    fn recipe_ids_mut(&mut self) -> &mut Vec<Uuid> {
        &mut self.recipe_ids
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} <{}>", self.name, self.email)?;
        writeln!(f, "ID: {}", self.id)?;
        write!(f, "Recipes: {}", self.recipe_ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_new() {
        let author = Author::new("Ada", "ada@example.com");
        assert_eq!(author.name, "Ada");
        assert_eq!(author.email, "ada@example.com");
        assert!(author.recipe_ids.is_empty());
    }

    #[test]
    fn test_has_email_ignores_case_and_whitespace() {
        let author = Author::new("Ada", "Ada@Example.com");
        assert!(author.has_email("ada@example.com"));
        assert!(author.has_email("  ADA@EXAMPLE.COM "));
        assert!(!author.has_email("bob@example.com"));
    }

    #[test]
    fn test_missing_recipe_ids_defaults_to_empty() {
        let json = format!(
            r#"{{"id":"{}","name":"Ada","email":"ada@example.com"}}"#,
            Uuid::new_v4()
        );
        let author: Author = serde_json::from_str(&json).unwrap();
        assert!(author.recipe_ids.is_empty());
    }
}
