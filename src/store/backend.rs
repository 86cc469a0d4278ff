use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use super::{ChangeSet, SqliteBackend, Tables};
use crate::config::{BackendKind, Config};
use crate::error::StorageError;

/// Every collection as of one revision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub tables: Tables,
    pub revision: u64,
}

/// Persistence for the entity store.
///
/// Each committed change set bumps the backend's revision. `commit` must be
/// atomic and must refuse a change set drafted against an older revision.
pub trait Backend: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Reads every collection together with the revision they belong to.
    fn load(&self) -> impl Future<Output = Result<Snapshot, StorageError>> + Send;

    /// The latest committed revision.
    fn revision(&self) -> impl Future<Output = Result<u64, StorageError>> + Send;

    /// Persists a change set drafted against revision `base` and returns
    /// the new revision. Fails with [`StorageError::Conflict`] if another
    /// writer committed since `base`.
    fn commit(
        &self,
        changes: &ChangeSet,
        base: u64,
    ) -> impl Future<Output = Result<u64, StorageError>> + Send;
}

/// Keeps the catalog inside the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<Snapshot>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend preloaded with `tables`, stored as-is.
    pub fn with_tables(tables: Tables) -> Self {
        Self {
            state: Mutex::new(Snapshot {
                tables,
                revision: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<Snapshot, StorageError> {
        Ok(self.lock().clone())
    }

    async fn revision(&self) -> Result<u64, StorageError> {
        Ok(self.lock().revision)
    }

    async fn commit(&self, changes: &ChangeSet, base: u64) -> Result<u64, StorageError> {
        let mut state = self.lock();
        if state.revision != base {
            return Err(StorageError::Conflict {
                expected: base,
                found: state.revision,
            });
        }
        state.tables.apply(changes.clone());
        state.revision += 1;
        Ok(state.revision)
    }
}

/// Backend chosen at runtime from configuration.
pub enum AnyBackend {
    Memory(MemoryBackend),
    Sqlite(SqliteBackend),
}

impl AnyBackend {
    pub fn memory() -> Self {
        AnyBackend::Memory(MemoryBackend::new())
    }

    pub async fn from_config(config: &Config) -> Result<Self, StorageError> {
        match config.backend.value {
            BackendKind::Memory => Ok(Self::memory()),
            BackendKind::Sqlite => {
                let backend =
                    SqliteBackend::open(&config.database_path.value, config.retry.clone()).await?;
                Ok(AnyBackend::Sqlite(backend))
            }
        }
    }
}

impl Backend for AnyBackend {
    fn name(&self) -> &'static str {
        match self {
            AnyBackend::Memory(backend) => backend.name(),
            AnyBackend::Sqlite(backend) => backend.name(),
        }
    }

    async fn load(&self) -> Result<Snapshot, StorageError> {
        match self {
            AnyBackend::Memory(backend) => backend.load().await,
            AnyBackend::Sqlite(backend) => backend.load().await,
        }
    }

    async fn revision(&self) -> Result<u64, StorageError> {
        match self {
            AnyBackend::Memory(backend) => backend.revision().await,
            AnyBackend::Sqlite(backend) => backend.revision().await,
        }
    }

    async fn commit(&self, changes: &ChangeSet, base: u64) -> Result<u64, StorageError> {
        match self {
            AnyBackend::Memory(backend) => backend.commit(changes, base).await,
            AnyBackend::Sqlite(backend) => backend.commit(changes, base).await,
        }
    }
}
