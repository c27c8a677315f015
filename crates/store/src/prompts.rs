//! Prompt version store.
//!
//! Versions of a prompt are numbered 1, 2, 3, ... with no gaps. Appending
//! reads the current maximum and inserts `max + 1` inside a single
//! `BEGIN IMMEDIATE` transaction, so the write lock is held across the read.
//! The `UNIQUE (prompt_id, version)` constraint rejects any duplicate that
//! slips through; such a collision, or a lock wait that outlives the busy
//! timeout, is retried a bounded number of times before surfacing as
//! `VersionConflict`.

use promptvault_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::time::Duration;

use crate::db::{
    is_busy, is_unique_violation, now_timestamp, persistence, timestamp_at, validate_name,
};
use crate::types::{Prompt, PromptVersion, ResolvedContent, VersionInfo};
use crate::vaults::VaultRegistry;

/// Attempts made by [`PromptStore::append_version`] before giving up.
pub const MAX_APPEND_ATTEMPTS: u32 = 5;

const RETRY_BACKOFF: Duration = Duration::from_millis(25);

const PROMPT_COLUMNS: &str = "p.id, p.vault_id, v.name, p.name, p.created_at, COALESCE(MAX(pv.version), 0)";

/// Versioned prompt storage.
pub struct PromptStore<'a> {
    conn: &'a Connection,
}

impl<'a> PromptStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a prompt in the named vault with `content` as version 1.
    pub fn add(&self, vault_name: &str, name: &str, content: &str) -> AppResult<Prompt> {
        let vault = VaultRegistry::new(self.conn).get(vault_name)?;
        self.create_prompt(vault.id, name, content)
    }

    /// Create a prompt and its first version atomically.
    ///
    /// Fails with `DuplicateName` if the vault already has a prompt with this
    /// name; in that case nothing is written.
    pub fn create_prompt(&self, vault_id: i64, name: &str, content: &str) -> AppResult<Prompt> {
        validate_name("prompt", name)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(persistence("begin transaction"))?;

        let vault_name: String = tx
            .query_row(
                "SELECT name FROM vaults WHERE id = ?1",
                params![vault_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(persistence("look up vault"))?
            .ok_or_else(|| AppError::not_found("vault", format!("#{}", vault_id)))?;

        let (created_at, stamp) = now_timestamp();

        if let Err(e) = tx.execute(
            "INSERT INTO prompts (vault_id, name, created_at) VALUES (?1, ?2, ?3)",
            params![vault_id, name, stamp],
        ) {
            return Err(if is_unique_violation(&e) {
                AppError::DuplicateName(format!(
                    "prompt '{}' already exists in vault '{}'",
                    name, vault_name
                ))
            } else {
                persistence("create prompt")(e)
            });
        }
        let prompt_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO prompt_versions (prompt_id, version, content, created_at)
             VALUES (?1, 1, ?2, ?3)",
            params![prompt_id, content, stamp],
        )
        .map_err(persistence("store first version"))?;

        tx.commit().map_err(persistence("commit prompt"))?;

        tracing::debug!("Created prompt '{}/{}' (id {})", vault_name, name, prompt_id);
        Ok(Prompt {
            id: prompt_id,
            vault_id,
            vault_name,
            name: name.to_string(),
            created_at,
            latest_version: 1,
        })
    }

    /// Store `content` as the next version of an existing prompt.
    ///
    /// Safe to call concurrently from several connections or processes
    /// sharing one database file: each caller receives a distinct version and
    /// the sequence stays contiguous.
    pub fn append_version(
        &self,
        vault_name: &str,
        prompt_name: &str,
        content: &str,
    ) -> AppResult<PromptVersion> {
        let target = format!("{}/{}", vault_name, prompt_name);
        retry_conflicts(&target, || self.try_append(vault_name, prompt_name, content))
    }

    fn try_append(
        &self,
        vault_name: &str,
        prompt_name: &str,
        content: &str,
    ) -> AppResult<PromptVersion> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(conflict_or("begin transaction"))?;

        let prompt_id = self.prompt_id_in(&tx, vault_name, prompt_name)?;

        let current: u32 = tx
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM prompt_versions WHERE prompt_id = ?1",
                params![prompt_id],
                |row| row.get(0),
            )
            .map_err(conflict_or("read latest version"))?;
        let version = current + 1;

        let (created_at, stamp) = now_timestamp();
        tx.execute(
            "INSERT INTO prompt_versions (prompt_id, version, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![prompt_id, version, content, stamp],
        )
        .map_err(conflict_or("store version"))?;
        let id = tx.last_insert_rowid();

        tx.commit().map_err(conflict_or("commit version"))?;

        tracing::debug!("Stored '{}/{}' version {}", vault_name, prompt_name, version);
        Ok(PromptVersion {
            id,
            prompt_id,
            version,
            content: content.to_string(),
            created_at,
        })
    }

    /// Look up a prompt and its highest version number.
    pub fn latest(&self, vault_name: &str, prompt_name: &str) -> AppResult<Prompt> {
        let sql = format!(
            "SELECT {} FROM prompts p
             JOIN vaults v ON p.vault_id = v.id
             LEFT JOIN prompt_versions pv ON pv.prompt_id = p.id
             WHERE v.name = ?1 AND p.name = ?2
             GROUP BY p.id",
            PROMPT_COLUMNS
        );

        let prompt = self
            .conn
            .query_row(&sql, params![vault_name, prompt_name], row_to_prompt)
            .optional()
            .map_err(persistence("look up prompt"))?;

        match prompt {
            Some(prompt) => Ok(prompt),
            None => Err(self.prompt_not_found(vault_name, prompt_name)),
        }
    }

    /// Content of a specific version.
    pub fn content_at(
        &self,
        vault_name: &str,
        prompt_name: &str,
        version: u32,
    ) -> AppResult<ResolvedContent> {
        let prompt = self.latest(vault_name, prompt_name)?;

        self.conn
            .query_row(
                "SELECT id, version, content FROM prompt_versions
                 WHERE prompt_id = ?1 AND version = ?2",
                params![prompt.id, version],
                row_to_content,
            )
            .optional()
            .map_err(persistence("read version"))?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "version {} of prompt '{}/{}' (latest is {})",
                    version, vault_name, prompt_name, prompt.latest_version
                ))
            })
    }

    /// Content of the highest version of a prompt.
    pub fn content_latest(&self, prompt_id: i64) -> AppResult<ResolvedContent> {
        self.conn
            .query_row(
                "SELECT id, version, content FROM prompt_versions
                 WHERE prompt_id = ?1 ORDER BY version DESC LIMIT 1",
                params![prompt_id],
                row_to_content,
            )
            .optional()
            .map_err(persistence("read latest version"))?
            .ok_or_else(|| AppError::not_found("versions for prompt", format!("#{}", prompt_id)))
    }

    /// Version numbers and timestamps, newest first.
    pub fn history(&self, prompt_id: i64) -> AppResult<Vec<VersionInfo>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT version, created_at FROM prompt_versions
                 WHERE prompt_id = ?1 ORDER BY version DESC",
            )
            .map_err(persistence("read history"))?;

        let history = stmt
            .query_map(params![prompt_id], |row| {
                Ok(VersionInfo {
                    version: row.get(0)?,
                    created_at: timestamp_at(row, 1)?,
                })
            })
            .map_err(persistence("read history"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(persistence("read history row"))?;

        Ok(history)
    }

    /// Prompts in a vault, newest first.
    pub fn list(&self, vault_name: &str) -> AppResult<Vec<Prompt>> {
        let vault = VaultRegistry::new(self.conn).get(vault_name)?;

        let sql = format!(
            "SELECT {} FROM prompts p
             JOIN vaults v ON p.vault_id = v.id
             LEFT JOIN prompt_versions pv ON pv.prompt_id = p.id
             WHERE p.vault_id = ?1
             GROUP BY p.id
             ORDER BY p.created_at DESC, p.id DESC",
            PROMPT_COLUMNS
        );

        let mut stmt = self.conn.prepare(&sql).map_err(persistence("list prompts"))?;
        let prompts = stmt
            .query_map(params![vault.id], row_to_prompt)
            .map_err(persistence("list prompts"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(persistence("read prompt row"))?;

        Ok(prompts)
    }

    fn prompt_id_in(&self, conn: &Connection, vault_name: &str, prompt_name: &str) -> AppResult<i64> {
        conn.query_row(
            "SELECT p.id FROM prompts p JOIN vaults v ON p.vault_id = v.id
             WHERE v.name = ?1 AND p.name = ?2",
            params![vault_name, prompt_name],
            |row| row.get(0),
        )
        .optional()
        .map_err(conflict_or("look up prompt"))?
        .ok_or_else(|| self.prompt_not_found(vault_name, prompt_name))
    }

    /// Name the missing piece: the vault itself or the prompt inside it.
    fn prompt_not_found(&self, vault_name: &str, prompt_name: &str) -> AppError {
        match VaultRegistry::new(self.conn).find(vault_name) {
            Ok(Some(_)) => AppError::not_found("prompt", format!("{}/{}", vault_name, prompt_name)),
            Ok(None) => AppError::not_found("vault", vault_name),
            Err(e) => e,
        }
    }
}

fn row_to_prompt(row: &rusqlite::Row<'_>) -> rusqlite::Result<Prompt> {
    Ok(Prompt {
        id: row.get(0)?,
        vault_id: row.get(1)?,
        vault_name: row.get(2)?,
        name: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
        latest_version: row.get(5)?,
    })
}

fn row_to_content(row: &rusqlite::Row<'_>) -> rusqlite::Result<ResolvedContent> {
    Ok(ResolvedContent {
        version_id: row.get(0)?,
        version: row.get(1)?,
        content: row.get(2)?,
    })
}

/// Run `op` until it succeeds or fails with something other than
/// `VersionConflict`, at most [`MAX_APPEND_ATTEMPTS`] times.
fn retry_conflicts<T>(target: &str, mut op: impl FnMut() -> AppResult<T>) -> AppResult<T> {
    let mut attempt = 1;
    loop {
        match op() {
            Err(AppError::VersionConflict(reason)) if attempt < MAX_APPEND_ATTEMPTS => {
                tracing::debug!(
                    "Version append for '{}' conflicted (attempt {}): {}",
                    target,
                    attempt,
                    reason
                );
                std::thread::sleep(RETRY_BACKOFF * attempt);
                attempt += 1;
            }
            Err(AppError::VersionConflict(reason)) => {
                return Err(AppError::VersionConflict(format!(
                    "could not append to '{}' after {} attempts: {}",
                    target, attempt, reason
                )));
            }
            result => return result,
        }
    }
}

/// Classify lock timeouts and duplicate versions as retryable conflicts.
fn conflict_or(action: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| {
        if is_busy(&e) || is_unique_violation(&e) {
            AppError::VersionConflict(format!("{}: {}", action, e))
        } else {
            persistence(action)(e)
        }
    }
}
