use std::collections::HashMap;
use uuid::Uuid;

use super::Entity;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Author, Ingredient, Recipe};

/// Committed records, one id-indexed map per collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub(crate) authors: HashMap<Uuid, Author>,
    pub(crate) ingredients: HashMap<Uuid, Ingredient>,
    pub(crate) recipes: HashMap<Uuid, Recipe>,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<E: Entity>(&self, id: Uuid) -> Option<&E> {
        E::table(self).get(&id)
    }

    pub fn require<E: Entity>(&self, id: Uuid) -> CatalogResult<&E> {
        self.get(id)
            .ok_or_else(|| CatalogError::not_found(E::COLLECTION, id))
    }

    /// All records of one collection, in no particular order.
    pub fn all<E: Entity>(&self) -> impl Iterator<Item = &E> {
        E::table(self).values()
    }

    pub fn count<E: Entity>(&self) -> usize {
        E::table(self).len()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty() && self.ingredients.is_empty() && self.recipes.is_empty()
    }

    /// Inserts or replaces a record. Bypasses reference maintenance; used
    /// when loading from a backend.
    pub fn insert<E: Entity>(&mut self, record: E) {
        E::table_mut(self).insert(record.id(), record);
    }

    pub fn apply(&mut self, changes: ChangeSet) {
        let ChangeSet {
            authors,
            ingredients,
            recipes,
        } = changes;
        apply_staged(&mut self.authors, authors);
        apply_staged(&mut self.ingredients, ingredients);
        apply_staged(&mut self.recipes, recipes);
    }
}

fn apply_staged<E>(table: &mut HashMap<Uuid, E>, staged: HashMap<Uuid, Option<E>>) {
    for (id, record) in staged {
        match record {
            Some(record) => {
                table.insert(id, record);
            }
            None => {
                table.remove(&id);
            }
        }
    }
}

/// Staged writes: `Some` upserts the record, `None` deletes it.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub(crate) authors: HashMap<Uuid, Option<Author>>,
    pub(crate) ingredients: HashMap<Uuid, Option<Ingredient>>,
    pub(crate) recipes: HashMap<Uuid, Option<Recipe>>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records touched.
    pub fn len(&self) -> usize {
        self.authors.len() + self.ingredients.len() + self.recipes.len()
    }

    pub fn upserts<E: Entity>(&self) -> impl Iterator<Item = &E> {
        E::staged(self).values().flatten()
    }

    pub fn deletions<E: Entity>(&self) -> impl Iterator<Item = Uuid> + '_ {
        E::staged(self)
            .iter()
            .filter(|(_, record)| record.is_none())
            .map(|(id, _)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_upserts_and_deletes() {
        let mut tables = Tables::new();
        let keep = Author::new("Keep", "keep@example.com");
        let drop = Author::new("Drop", "drop@example.com");
        tables.insert(keep.clone());
        tables.insert(drop.clone());

        let mut renamed = keep.clone();
        renamed.name = "Kept".to_string();

        let mut changes = ChangeSet::default();
        changes.authors.insert(keep.id, Some(renamed));
        changes.authors.insert(drop.id, None);
        assert_eq!(changes.len(), 2);

        tables.apply(changes);

        assert_eq!(tables.count::<Author>(), 1);
        assert_eq!(tables.get::<Author>(keep.id).unwrap().name, "Kept");
        assert!(tables.get::<Author>(drop.id).is_none());
    }

    #[test]
    fn test_require_reports_collection() {
        let tables = Tables::new();
        let id = Uuid::new_v4();
        let err = tables.require::<Ingredient>(id).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::NotFound { collection: crate::store::Collection::Ingredients, id: missing } if missing == id
        ));
    }

    #[test]
    fn test_change_set_views() {
        let author = Author::new("Ada", "ada@example.com");
        let gone = Uuid::new_v4();

        let mut changes = ChangeSet::default();
        changes.authors.insert(author.id, Some(author.clone()));
        changes.authors.insert(gone, None);

        let upserts: Vec<&Author> = changes.upserts::<Author>().collect();
        assert_eq!(upserts, vec![&author]);
        let deletions: Vec<Uuid> = changes.deletions::<Author>().collect();
        assert_eq!(deletions, vec![gone]);
        assert_eq!(changes.upserts::<Recipe>().count(), 0);
    }
}
