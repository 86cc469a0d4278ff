//! Entity store: id-indexed collections with staged, all-or-nothing commits.
//!
//! Mutations are staged in a [`Draft`] over the committed [`Tables`]. The
//! resulting [`ChangeSet`] is persisted by the [`Backend`] and only then
//! applied in memory, so a failure at any step leaves the store untouched.
//!
//! The in-memory tables are a cache of one backend revision. Whenever the
//! backend reports a newer revision (another process wrote to the same
//! database, or a commit finished after its caller went away) the tables are
//! reloaded before they are read or drafted against.

mod backend;
mod check;
mod draft;
mod retry;
mod sqlite;
mod tables;

pub use backend::{AnyBackend, Backend, MemoryBackend, Snapshot};
pub use check::Violation;
pub use draft::Draft;
pub use sqlite::SqliteBackend;
pub use tables::{ChangeSet, Tables};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::{RwLock, RwLockReadGuard};
use uuid::Uuid;

use crate::error::{CatalogResult, StorageError};
use crate::models::{Author, Ingredient, Recipe};

/// The three record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Authors,
    Ingredients,
    Recipes,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Authors,
        Collection::Ingredients,
        Collection::Recipes,
    ];

    /// Table name used by persistent backends.
    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Authors => "authors",
            Collection::Ingredients => "ingredients",
            Collection::Recipes => "recipes",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Authors => write!(f, "author"),
            Collection::Ingredients => write!(f, "ingredient"),
            Collection::Recipes => write!(f, "recipe"),
        }
    }
}

/// A record type stored in one of the collections.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> Uuid;
    fn table(tables: &Tables) -> &HashMap<Uuid, Self>;
    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self>;
    fn staged(changes: &ChangeSet) -> &HashMap<Uuid, Option<Self>>;
    fn staged_mut(changes: &mut ChangeSet) -> &mut HashMap<Uuid, Option<Self>>;
}

macro_rules! entity {
    ($ty:ty, $collection:ident, $field:ident) => {
        impl Entity for $ty {
            const COLLECTION: Collection = Collection::$collection;

            fn id(&self) -> Uuid {
                self.id
            }

            fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
                &tables.$field
            }

            fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
                &mut tables.$field
            }

            fn staged(changes: &ChangeSet) -> &HashMap<Uuid, Option<Self>> {
                &changes.$field
            }

            fn staged_mut(changes: &mut ChangeSet) -> &mut HashMap<Uuid, Option<Self>> {
                &mut changes.$field
            }
        }
    };
}

entity!(Author, Authors, authors);
entity!(Ingredient, Ingredients, ingredients);
entity!(Recipe, Recipes, recipes);

/// How often a mutation is redrafted after losing a race with another writer.
const MAX_REDRAFTS: u32 = 8;

/// Committed tables plus the backend that persists them.
///
/// Mutations hold the write lock from drafting through persistence, so they
/// are serialized within the process and readers only ever see committed
/// state.
pub struct Store<B = AnyBackend> {
    state: RwLock<Snapshot>,
    backend: B,
}

impl<B: Backend> Store<B> {
    /// Opens the store, loading every collection from the backend.
    pub async fn open(backend: B) -> Result<Self, StorageError> {
        let snapshot = backend.load().await?;
        tracing::info!(
            backend = backend.name(),
            revision = snapshot.revision,
            authors = snapshot.tables.count::<Author>(),
            ingredients = snapshot.tables.count::<Ingredient>(),
            recipes = snapshot.tables.count::<Recipe>(),
            "Opened catalog store"
        );
        Ok(Self::with_snapshot(backend, snapshot))
    }

    /// Wraps a backend that currently holds exactly `snapshot`.
    pub fn with_snapshot(backend: B, snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
            backend,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Shared access to the committed tables, reloaded first if the backend
    /// has moved on. If the reload fails the cached tables are served.
    pub async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Failed to reload catalog, serving cached tables");
        }
        RwLockReadGuard::map(self.state.read().await, |state| &state.tables)
    }

    /// Reloads the tables if the backend is past the cached revision.
    /// Returns whether a reload happened.
    pub async fn refresh(&self) -> Result<bool, StorageError> {
        let revision = self.backend.revision().await?;
        if revision == self.state.read().await.revision {
            return Ok(false);
        }
        let mut state = self.state.write().await;
        self.sync(&mut state).await
    }

    async fn sync(&self, state: &mut Snapshot) -> Result<bool, StorageError> {
        let revision = self.backend.revision().await?;
        if revision == state.revision {
            return Ok(false);
        }
        self.reload(state).await?;
        Ok(true)
    }

    async fn reload(&self, state: &mut Snapshot) -> Result<(), StorageError> {
        let fresh = self.backend.load().await?;
        tracing::info!(
            from = state.revision,
            to = fresh.revision,
            "Reloaded catalog tables"
        );
        *state = fresh;
        Ok(())
    }

    /// Runs `op` against a fresh draft and commits what it staged.
    ///
    /// If `op` or the backend fails, nothing is applied. When another
    /// writer commits first, `op` runs again on the reloaded tables.
    pub async fn transact<T, F>(&self, mut op: F) -> CatalogResult<T>
    where
        F: FnMut(&mut Draft<'_>) -> CatalogResult<T>,
    {
        let mut state = self.state.write().await;
        self.sync(&mut state).await?;
        let mut redrafts = 0;

        loop {
            let (value, changes) = {
                let mut draft = Draft::new(&state.tables);
                let value = op(&mut draft)?;
                (value, draft.into_changes())
            };

            if changes.is_empty() {
                return Ok(value);
            }

            match self.backend.commit(&changes, state.revision).await {
                Ok(revision) => {
                    tracing::debug!(records = changes.len(), revision, "Committed change set");
                    state.tables.apply(changes);
                    state.revision = revision;
                    return Ok(value);
                }
                Err(StorageError::Conflict { expected, found }) if redrafts < MAX_REDRAFTS => {
                    redrafts += 1;
                    tracing::warn!(expected, found, "Catalog changed by another writer, redrafting");
                    self.reload(&mut state).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn memory_store() -> Store<MemoryBackend> {
        Store::open(MemoryBackend::new()).await.unwrap()
    }

    /// Accepts nothing.
    struct FailingBackend;

    impl Backend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn load(&self) -> Result<Snapshot, StorageError> {
            Ok(Snapshot::default())
        }

        async fn revision(&self) -> Result<u64, StorageError> {
            Ok(0)
        }

        async fn commit(&self, _changes: &ChangeSet, _base: u64) -> Result<u64, StorageError> {
            Err(StorageError::Database(sqlx::Error::PoolClosed))
        }
    }

    /// A second handle on one memory backend. With `stale` set it always
    /// reports revision 0, so the store only learns about other writers
    /// through commit conflicts.
    struct Shared {
        inner: Arc<MemoryBackend>,
        stale: bool,
    }

    impl Backend for Shared {
        fn name(&self) -> &'static str {
            "shared"
        }

        async fn load(&self) -> Result<Snapshot, StorageError> {
            self.inner.load().await
        }

        async fn revision(&self) -> Result<u64, StorageError> {
            if self.stale {
                Ok(0)
            } else {
                self.inner.revision().await
            }
        }

        async fn commit(&self, changes: &ChangeSet, base: u64) -> Result<u64, StorageError> {
            self.inner.commit(changes, base).await
        }
    }

    fn insert_change(author: &Author) -> ChangeSet {
        let empty = Tables::new();
        let mut draft = Draft::new(&empty);
        draft.insert(author.clone());
        draft.into_changes()
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(Collection::Authors.to_string(), "author");
        assert_eq!(Collection::Recipes.table_name(), "recipes");
        assert_eq!(<Ingredient as Entity>::COLLECTION, Collection::Ingredients);
    }

    #[tokio::test]
    async fn test_transact_applies_changes() {
        let store = memory_store().await;
        let author = Author::new("Ada", "ada@example.com");
        let id = author.id;

        store
            .transact(|draft| {
                draft.insert(author.clone());
                Ok(())
            })
            .await
            .unwrap();

        assert!(store.read().await.get::<Author>(id).is_some());
        assert_eq!(store.backend().revision().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_transact_failure_discards_draft() {
        let store = memory_store().await;
        let author = Author::new("Ada", "ada@example.com");
        let id = author.id;

        let result: CatalogResult<()> = store
            .transact(|draft| {
                draft.insert(author.clone());
                Err(CatalogError::InvalidInput("boom".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert!(store.read().await.get::<Author>(id).is_none());
        assert_eq!(store.backend().revision().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_leaves_tables_unchanged() {
        let mut tables = Tables::new();
        tables.insert(Author::new("Ada", "ada@example.com"));
        let store = Store::with_snapshot(
            FailingBackend,
            Snapshot {
                tables: tables.clone(),
                revision: 0,
            },
        );

        let err = store
            .transact(|draft| {
                draft.insert(Author::new("Grace", "grace@example.com"));
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::Storage(StorageError::Database(sqlx::Error::PoolClosed))
        ));
        assert_eq!(*store.read().await, tables);
    }

    #[tokio::test]
    async fn test_read_picks_up_other_writers() {
        let inner = Arc::new(MemoryBackend::new());
        let store = Store::open(Shared {
            inner: Arc::clone(&inner),
            stale: false,
        })
        .await
        .unwrap();

        let ada = Author::new("Ada", "ada@example.com");
        inner.commit(&insert_change(&ada), 0).await.unwrap();

        assert_eq!(store.read().await.get::<Author>(ada.id), Some(&ada));
    }

    #[tokio::test]
    async fn test_transact_redrafts_after_conflict() {
        let inner = Arc::new(MemoryBackend::new());
        let store = Store::open(Shared {
            inner: Arc::clone(&inner),
            stale: true,
        })
        .await
        .unwrap();

        let ada = Author::new("Ada", "ada@example.com");
        inner.commit(&insert_change(&ada), 0).await.unwrap();

        let runs = AtomicU32::new(0);
        let grace = Author::new("Grace", "grace@example.com");
        let seen = store
            .transact(|draft| {
                runs.fetch_add(1, Ordering::SeqCst);
                draft.insert(grace.clone());
                Ok(draft.iter::<Author>().count())
            })
            .await
            .unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(seen, 2);
        let snapshot = inner.load().await.unwrap();
        assert_eq!(snapshot.revision, 2);
        assert!(snapshot.tables.get::<Author>(ada.id).is_some());
        assert!(snapshot.tables.get::<Author>(grace.id).is_some());
    }
}
