//! Error types shared by the store and the catalog.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::store::Collection;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors reported by catalog operations.
///
/// A failed operation never leaves partial changes behind.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{collection} not found: {id}")]
    NotFound { collection: Collection, id: Uuid },

    #[error("{collection} with {field} '{value}' already exists")]
    AlreadyExists {
        collection: Collection,
        field: &'static str,
        value: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CatalogError {
    pub fn not_found(collection: Collection, id: Uuid) -> Self {
        CatalogError::NotFound { collection, id }
    }

    /// Stable machine-readable code, used in API responses.
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::NotFound { .. } => "not_found",
            CatalogError::AlreadyExists { .. } => "already_exists",
            CatalogError::InvalidInput(_) => "invalid_input",
            CatalogError::Storage(_) => "storage_error",
        }
    }
}

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create database directory '{}': {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to decode {collection} document '{id}': {source}")]
    Decode {
        collection: Collection,
        id: String,
        source: serde_json::Error,
    },

    #[error("Failed to encode {collection} document '{id}': {source}")]
    Encode {
        collection: Collection,
        id: Uuid,
        source: serde_json::Error,
    },

    #[error("Catalog was changed by another writer: expected revision {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },
}

impl StorageError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Database(e) => is_transient_sqlx(e),
            _ => false,
        }
    }
}

/// SQLITE_BUSY and SQLITE_LOCKED (including their extended codes).
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

pub(crate) fn is_transient_sqlx(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false),
        _ => false,
    }
}
