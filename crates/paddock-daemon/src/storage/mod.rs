//! SQLite adapter kit for the paddock store traits.
//!
//! One adapter per core store trait, all sharing a single
//! `Arc<Mutex<Connection>>` so a daemon owns exactly one database handle.
//! Call [`open`] once at startup; it creates the schema idempotently.
//!
//! Correctness relies on SQLite's native atomicity, not in-process locks:
//! prediction uniqueness is the table's primary key surfaced as a typed
//! constraint violation, mode-flag writes are single-statement upserts, and
//! result replacement runs inside one transaction.
//!
//! The [`memory`] sub-module provides in-memory implementations of the same
//! traits for unit tests.

pub mod ledger;
pub mod memory;
pub mod mode;
pub mod results;
pub mod roster;

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use thiserror::Error;

pub use ledger::SqliteLedgerStore;
pub use mode::SqliteModeStore;
pub use results::SqliteResultsStore;
pub use roster::SqliteRosterStore;

/// Database schema, applied idempotently at startup.
const SCHEMA_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS mode_flags (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS predictions (
        bettor_id     TEXT    NOT NULL,
        race_id       INTEGER NOT NULL,
        first_choice  INTEGER NOT NULL,
        second_choice INTEGER,
        third_choice  INTEGER,
        PRIMARY KEY (bettor_id, race_id)
    );

    CREATE TABLE IF NOT EXISTS results (
        race_id  INTEGER NOT NULL,
        horse_id INTEGER NOT NULL,
        rank     INTEGER NOT NULL,
        PRIMARY KEY (race_id, horse_id)
    );

    CREATE TABLE IF NOT EXISTS horses (
        horse_id INTEGER PRIMARY KEY,
        name     TEXT NOT NULL,
        info     TEXT NOT NULL
    );
";

/// Shared handle to the daemon's single database connection.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Errors from opening the database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database file could not be opened.
    #[error("failed to open database at {path}: {source}")]
    Open {
        /// The path that failed.
        path: String,
        /// The driver error.
        #[source]
        source: rusqlite::Error,
    },

    /// Schema initialization failed.
    #[error("schema initialization failed: {0}")]
    Schema(#[source] rusqlite::Error),
}

/// Opens (or creates) the database at `path` and initializes the schema.
///
/// `:memory:` is accepted for ephemeral deployments and tests.
///
/// # Errors
///
/// Returns [`StorageError`] if the file cannot be opened or the schema
/// cannot be applied.
pub fn open(path: &str) -> Result<SharedConnection, StorageError> {
    let conn = Connection::open(path).map_err(|source| StorageError::Open {
        path: path.to_string(),
        source,
    })?;
    conn.execute_batch(SCHEMA_SQL).map_err(StorageError::Schema)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Locks the shared connection, mapping a poisoned mutex to a description
/// the adapters wrap in their own storage-error variants.
pub(crate) fn lock(conn: &SharedConnection) -> Result<MutexGuard<'_, Connection>, String> {
    conn.lock().map_err(|e| format!("connection mutex poisoned: {e}"))
}
