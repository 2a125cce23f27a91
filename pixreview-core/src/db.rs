//! Durable review-state store.
//!
//! Every `pixreview` process in the same working directory opens the same
//! WAL-mode SQLite file, so a verdict written by one review window is seen by
//! the index listing running in another. Change detection across processes
//! uses `PRAGMA data_version`, which only moves when a *different* connection
//! commits.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::types::{ClassificationState, ResetPolicy, ResetReport, ResetScope, ReviewKey};

/// Errors raised by the review store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database connection error: {0}")]
    Connection(#[from] tokio_rusqlite::Error),
    #[error("cannot create database directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Handle to the review-state database.
///
/// Cloning is cheap and every clone talks to the same background connection,
/// so writes through one clone are immediately visible to the others.
#[derive(Clone)]
pub struct ReviewStore {
    conn: Connection,
}

/// Returns the current Unix timestamp in seconds.
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

impl ReviewStore {
    /// Opens (or creates) the database at `path`, configures WAL mode and
    /// applies schema migrations.
    ///
    /// The parent directory is created when missing. `busy_timeout` is set via
    /// the `Connection` method rather than a PRAGMA string so it survives
    /// pragma caching.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the directory or file cannot be created, WAL
    /// configuration fails, or the schema DDL fails.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let conn = Connection::open(path).await?;

        conn.call(|db| {
            db.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;",
            )?;
            db.busy_timeout(Duration::from_secs(5))?;
            crate::schema::migrate(db)?;
            Ok::<_, rusqlite::Error>(())
        })
        .await?;

        tracing::debug!(path = %path.display(), "review store opened");
        Ok(Self { conn })
    }

    /// Returns the stored state for `key`, `Unset` when there is no row.
    pub async fn get(&self, key: &ReviewKey) -> Result<ClassificationState, StoreError> {
        let raw = key.storage_key();
        let value = self
            .conn
            .call(move |db| {
                db.query_row(
                    "SELECT value FROM review_state WHERE key = ?1",
                    rusqlite::params![&raw],
                    |r| r.get::<_, String>(0),
                )
                .optional()
            })
            .await?;
        Ok(value
            .as_deref()
            .map(ClassificationState::from_stored)
            .unwrap_or_default())
    }

    /// Overwrites the state for `key`. Writing `Unset` removes the row.
    ///
    /// The write is committed before this returns.
    pub async fn set(&self, key: &ReviewKey, state: ClassificationState) -> Result<(), StoreError> {
        let Some(value) = state.as_stored() else {
            return self.remove(key).await;
        };
        let raw = key.storage_key();

        self.conn
            .call(move |db| {
                let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                tx.execute(
                    "INSERT INTO review_state (key, value, updated_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(key)
                     DO UPDATE SET value = excluded.value,
                                   updated_at = excluded.updated_at",
                    rusqlite::params![&raw, value, now_secs()],
                )?;
                tx.commit()?;
                Ok::<_, rusqlite::Error>(())
            })
            .await?;

        tracing::debug!(key = %key, state = %state, "review state written");
        Ok(())
    }

    /// Deletes the row for `key`; absent keys are not an error.
    pub async fn remove(&self, key: &ReviewKey) -> Result<(), StoreError> {
        self.remove_raw(key.storage_key()).await
    }

    async fn remove_raw(&self, raw: String) -> Result<(), StoreError> {
        self.conn
            .call(move |db| {
                db.execute("DELETE FROM review_state WHERE key = ?1", rusqlite::params![&raw])?;
                Ok::<_, rusqlite::Error>(())
            })
            .await?;
        Ok(())
    }

    /// Enumerates every stored key, in insertion order.
    pub async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let keys = self
            .conn
            .call(|db| {
                let mut stmt = db.prepare("SELECT key FROM review_state ORDER BY rowid")?;
                let rows = stmt
                    .query_map([], |r| r.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok::<_, rusqlite::Error>(rows)
            })
            .await?;
        Ok(keys)
    }

    /// Loads every stored key together with its state.
    ///
    /// Rows whose value is not a known state are skipped (they read as unset).
    pub async fn snapshot(&self) -> Result<HashMap<String, ClassificationState>, StoreError> {
        let rows = self
            .conn
            .call(|db| {
                let mut stmt = db.prepare("SELECT key, value FROM review_state")?;
                let rows = stmt
                    .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok::<_, rusqlite::Error>(rows)
            })
            .await?;

        Ok(rows
            .into_iter()
            .map(|(key, value)| (key, ClassificationState::from_stored(&value)))
            .filter(|(_, state)| *state != ClassificationState::Unset)
            .collect())
    }

    /// Removes every stored key whose state satisfies `predicate`.
    ///
    /// Each removal is its own statement; a failure on one key is logged and
    /// recorded in the report, and the remaining keys are still processed.
    ///
    /// # Errors
    ///
    /// Only the initial enumeration can fail the whole call.
    pub async fn reset_where<F>(&self, predicate: F) -> Result<ResetReport, StoreError>
    where
        F: Fn(ClassificationState) -> bool,
    {
        let entries = self.snapshot().await?;
        let mut report = ResetReport::default();

        for (raw, state) in entries {
            if !predicate(state) {
                continue;
            }
            match self.remove_raw(raw.clone()).await {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    tracing::warn!(key = %raw, error = %e, "failed to remove review state");
                    report.failed.push(raw);
                }
            }
        }

        tracing::info!(removed = report.removed, failed = report.failed.len(), "review states reset");
        Ok(report)
    }

    /// Removes every key that `scope` covers under `policy`.
    pub async fn reset(&self, scope: ResetScope, policy: ResetPolicy) -> Result<ResetReport, StoreError> {
        self.reset_where(|state| scope.matches(state, policy)).await
    }

    /// Returns SQLite's `data_version` for this connection.
    ///
    /// The value changes only when another connection (typically another
    /// `pixreview` process) commits; writes made through this store do not move it.
    pub async fn data_version(&self) -> Result<i64, StoreError> {
        let version = self
            .conn
            .call(|db| {
                let v: i64 = db.query_row("PRAGMA data_version", [], |r| r.get(0))?;
                Ok::<_, rusqlite::Error>(v)
            })
            .await?;
        Ok(version)
    }
}
