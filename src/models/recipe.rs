use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// When the recipe was added to the catalog.
    pub date: DateTime<Utc>,
    pub author_id: Uuid,
    #[serde(default)]
    pub ingredient_ids: Vec<Uuid>,
}

impl Recipe {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        author_id: Uuid,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            date,
            author_id,
            ingredient_ids: Vec::new(),
        }
    }

    pub fn with_ingredients(mut self, ingredient_ids: Vec<Uuid>) -> Self {
        self.ingredient_ids = ingredient_ids;
        self
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "=".repeat(self.title.chars().count()))?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Date: {}", self.date.format("%Y-%m-%d %H:%M"))?;
        if !self.description.is_empty() {
            writeln!(f, "\n{}", self.description)?;
        }
        Ok(())
    }
}
