use uuid::Uuid;

use super::{ChangeSet, Entity, Tables};
use crate::error::{CatalogError, CatalogResult};

/// Copy-on-write view over committed tables.
///
/// Reads see staged changes first, then the committed record. Writes only
/// touch the staged change set; dropping the draft discards them.
pub struct Draft<'a> {
    base: &'a Tables,
    changes: ChangeSet,
}

impl<'a> Draft<'a> {
    pub fn new(base: &'a Tables) -> Self {
        Self {
            base,
            changes: ChangeSet::default(),
        }
    }

    pub fn get<E: Entity>(&self, id: Uuid) -> Option<&E> {
        match E::staged(&self.changes).get(&id) {
            Some(staged) => staged.as_ref(),
            None => E::table(self.base).get(&id),
        }
    }

    pub fn require<E: Entity>(&self, id: Uuid) -> CatalogResult<&E> {
        self.get(id)
            .ok_or_else(|| CatalogError::not_found(E::COLLECTION, id))
    }

    /// Every live record of a collection, staged versions included.
    pub fn iter<E: Entity>(&self) -> impl Iterator<Item = &E> + '_ {
        let staged = E::staged(&self.changes);
        E::table(self.base)
            .values()
            .filter(move |record| !staged.contains_key(&record.id()))
            .chain(staged.values().flatten())
    }

    pub fn insert<E: Entity>(&mut self, record: E) {
        E::staged_mut(&mut self.changes).insert(record.id(), Some(record));
    }

    /// Applies `patch` to a copy of the record and stages the result.
    pub fn update<E: Entity>(&mut self, id: Uuid, patch: impl FnOnce(&mut E)) -> CatalogResult<&E> {
        let mut record = self.require::<E>(id)?.clone();
        patch(&mut record);
        let slot = E::staged_mut(&mut self.changes).entry(id).or_default();
        Ok(&*slot.insert(record))
    }

    pub fn remove<E: Entity>(&mut self, id: Uuid) -> CatalogResult<E> {
        let record = self.require::<E>(id)?.clone();
        E::staged_mut(&mut self.changes).insert(id, None);
        Ok(record)
    }

    pub fn into_changes(self) -> ChangeSet {
        self.changes
    }
}
