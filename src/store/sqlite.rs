//! SQLite document backend.
//!
//! Each collection is a table of JSON documents keyed by id:
//! ```text
//! authors(id TEXT PRIMARY KEY, body TEXT)
//! ingredients(id TEXT PRIMARY KEY, body TEXT)
//! recipes(id TEXT PRIMARY KEY, body TEXT)
//! catalog_revision(id = 0, revision INTEGER)
//! ```
//! A change set is written in a single transaction that first bumps the
//! revision row, so writers in other processes sharing the file see each
//! other's commits and never overwrite them from stale tables.

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

use super::retry::with_retry;
use super::{Backend, ChangeSet, Entity, Snapshot, Tables};
use crate::config::RetryPolicy;
use crate::error::StorageError;
use crate::models::{Author, Ingredient, Recipe};

const SELECT_REVISION: &str = "SELECT revision FROM catalog_revision WHERE id = 0";

pub struct SqliteBackend {
    pool: SqlitePool,
    retry: RetryPolicy,
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    body: String,
}

/// A serialized write, prepared before the transaction starts.
enum PendingWrite {
    Upsert {
        table: &'static str,
        id: String,
        body: String,
    },
    Delete {
        table: &'static str,
        id: String,
    },
}

impl SqliteBackend {
    /// Opens (creating if needed) the database file and runs migrations.
    pub async fn open(path: &Path, retry: RetryPolicy) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::from_pool(pool, retry).await
    }

    pub async fn from_pool(pool: SqlitePool, retry: RetryPolicy) -> Result<Self, StorageError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool, retry })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_collection<E: Entity>(
        conn: &mut SqliteConnection,
        tables: &mut Tables,
    ) -> Result<(), StorageError> {
        let sql = format!(
            "SELECT id, body FROM {} ORDER BY id",
            E::COLLECTION.table_name()
        );
        let rows: Vec<DocumentRow> = sqlx::query_as(&sql).fetch_all(&mut *conn).await?;

        for row in rows {
            let record: E =
                serde_json::from_str(&row.body).map_err(|source| StorageError::Decode {
                    collection: E::COLLECTION,
                    id: row.id.clone(),
                    source,
                })?;
            tables.insert(record);
        }
        Ok(())
    }

    async fn read_all(&self) -> Result<Snapshot, StorageError> {
        // One read transaction, so the revision matches the documents.
        let mut tx = self.pool.begin().await?;

        let (revision,): (i64,) = sqlx::query_as(SELECT_REVISION).fetch_one(&mut *tx).await?;
        let mut tables = Tables::new();
        Self::load_collection::<Author>(&mut *tx, &mut tables).await?;
        Self::load_collection::<Ingredient>(&mut *tx, &mut tables).await?;
        Self::load_collection::<Recipe>(&mut *tx, &mut tables).await?;

        tx.commit().await?;
        Ok(Snapshot {
            tables,
            revision: revision as u64,
        })
    }

    async fn write_all(&self, writes: &[PendingWrite], base: u64) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await?;

        // Writing first takes the database write lock before anything is read.
        let bumped: Option<(i64,)> = sqlx::query_as(
            "UPDATE catalog_revision SET revision = revision + 1 \
             WHERE id = 0 AND revision = ? RETURNING revision",
        )
        .bind(base as i64)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((revision,)) = bumped else {
            let (found,): (i64,) = sqlx::query_as(SELECT_REVISION).fetch_one(&mut *tx).await?;
            tx.rollback().await?;
            return Err(StorageError::Conflict {
                expected: base,
                found: found as u64,
            });
        };

        for write in writes {
            match write {
                PendingWrite::Upsert { table, id, body } => {
                    let sql = format!(
                        "INSERT INTO {} (id, body) VALUES (?, ?) \
                         ON CONFLICT(id) DO UPDATE SET body = excluded.body",
                        table
                    );
                    sqlx::query(&sql)
                        .bind(id)
                        .bind(body)
                        .execute(&mut *tx)
                        .await?;
                }
                PendingWrite::Delete { table, id } => {
                    let sql = format!("DELETE FROM {} WHERE id = ?", table);
                    sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
                }
            }
        }

        tx.commit().await?;
        Ok(revision as u64)
    }
}

impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn load(&self) -> Result<Snapshot, StorageError> {
        with_retry(&self.retry, move || self.read_all()).await
    }

    async fn revision(&self) -> Result<u64, StorageError> {
        let (revision,): (i64,) = sqlx::query_as(SELECT_REVISION)
            .fetch_one(&self.pool)
            .await?;
        Ok(revision as u64)
    }

    /// Retries only transient transport failures, with backoff.
    async fn commit(&self, changes: &ChangeSet, base: u64) -> Result<u64, StorageError> {
        let writes = encode(changes)?;
        let writes = writes.as_slice();
        with_retry(&self.retry, move || self.write_all(writes, base)).await
    }
}

fn encode(changes: &ChangeSet) -> Result<Vec<PendingWrite>, StorageError> {
    let mut writes = Vec::with_capacity(changes.len());
    encode_collection::<Author>(changes, &mut writes)?;
    encode_collection::<Ingredient>(changes, &mut writes)?;
    encode_collection::<Recipe>(changes, &mut writes)?;
    Ok(writes)
}

fn encode_collection<E: Entity>(
    changes: &ChangeSet,
    writes: &mut Vec<PendingWrite>,
) -> Result<(), StorageError> {
    let table = E::COLLECTION.table_name();

    for record in changes.upserts::<E>() {
        let body = serde_json::to_string(record).map_err(|source| StorageError::Encode {
            collection: E::COLLECTION,
            id: record.id(),
            source,
        })?;
        writes.push(PendingWrite::Upsert {
            table,
            id: record.id().to_string(),
            body,
        });
    }
    for id in changes.deletions::<E>() {
        writes.push(PendingWrite::Delete {
            table,
            id: id.to_string(),
        });
    }
    Ok(())
}
