//! SQLite connection setup, schema, and error helpers.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use promptvault_core::{AppError, AppResult};
use rusqlite::{Connection, ErrorCode, Row};
use std::path::Path;
use std::time::Duration;

use crate::prompts::PromptStore;
use crate::runs::RunLedger;
use crate::vaults::VaultRegistry;

/// How long a connection waits on another process's write lock.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS vaults (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS prompts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vault_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (vault_id) REFERENCES vaults(id),
    UNIQUE (vault_id, name)
);

CREATE TABLE IF NOT EXISTS prompt_versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    prompt_id INTEGER NOT NULL,
    version INTEGER NOT NULL CHECK (version > 0),
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (prompt_id) REFERENCES prompts(id),
    UNIQUE (prompt_id, version)
);

CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    prompt_version_id INTEGER NOT NULL,
    provider TEXT NOT NULL,
    params TEXT NOT NULL,
    response TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (prompt_version_id) REFERENCES prompt_versions(id)
);

CREATE INDEX IF NOT EXISTS idx_prompts_vault ON prompts(vault_id, created_at);
CREATE INDEX IF NOT EXISTS idx_runs_version ON runs(prompt_version_id);
CREATE INDEX IF NOT EXISTS idx_runs_created ON runs(created_at);
"#;

/// Handle to the prompt database.
///
/// The store owns a single connection and hands out borrowing views for each
/// component. Every command opens its own store; nothing is global.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Persistence(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Persistence(format!("Failed to open database {:?}: {}", path, e)))?;

        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(persistence("set busy timeout"))?;

        // WAL lets readers proceed while another process appends
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(persistence("enable WAL"))?;
        tracing::trace!("Journal mode: {}", mode);

        let store = Self::init(conn)?;
        tracing::debug!("Opened database at {:?}", path);
        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Persistence(format!("Failed to open in-memory database: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(persistence("enable foreign keys"))?;

        conn.execute_batch(SCHEMA)
            .map_err(persistence("create schema"))?;

        Ok(Self { conn })
    }

    /// Raw connection, for callers that need ad-hoc queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Vault registry view.
    pub fn vaults(&self) -> VaultRegistry<'_> {
        VaultRegistry::new(&self.conn)
    }

    /// Prompt version store view.
    pub fn prompts(&self) -> PromptStore<'_> {
        PromptStore::new(&self.conn)
    }

    /// Run ledger view.
    pub fn runs(&self) -> RunLedger<'_> {
        RunLedger::new(&self.conn)
    }
}

/// Current time in the fixed-width format stored in `created_at` columns.
///
/// Fixed width keeps lexical order equal to chronological order. The
/// returned value is truncated to the stored precision so it equals what a
/// later read yields.
pub(crate) fn now_timestamp() -> (DateTime<Utc>, String) {
    let now = Utc::now().trunc_subsecs(6);
    let text = format_timestamp(&now);
    (now, text)
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Read an RFC 3339 `created_at` column.
pub(crate) fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Map a rusqlite error to `Persistence` with the failing action named.
pub(crate) fn persistence(action: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| AppError::Persistence(format!("Failed to {}: {}", action, e))
}

/// Whether the error is a UNIQUE (or primary key) constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

/// Whether another connection held the lock past the busy timeout.
pub(crate) fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::DatabaseBusy || e.code == ErrorCode::DatabaseLocked
    )
}

/// Reject names that are empty once surrounding whitespace is removed.
pub(crate) fn validate_name(kind: &str, name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::InvalidName(format!("{} name cannot be empty", kind)));
    }
    Ok(())
}
