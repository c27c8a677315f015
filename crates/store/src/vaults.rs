//! Vault registry.

use promptvault_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::db::{is_unique_violation, now_timestamp, persistence, timestamp_at, validate_name};
use crate::types::Vault;

/// Create, look up, list and delete vaults.
pub struct VaultRegistry<'a> {
    conn: &'a Connection,
}

impl<'a> VaultRegistry<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a vault. Names are unique and case-sensitive.
    pub fn create(&self, name: &str) -> AppResult<Vault> {
        validate_name("vault", name)?;
        let (created_at, stamp) = now_timestamp();

        match self.conn.execute(
            "INSERT INTO vaults (name, created_at) VALUES (?1, ?2)",
            params![name, stamp],
        ) {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                tracing::debug!("Created vault '{}' (id {})", name, id);
                Ok(Vault {
                    id,
                    name: name.to_string(),
                    created_at,
                })
            }
            Err(e) if is_unique_violation(&e) => {
                Err(AppError::DuplicateName(format!("vault '{}' already exists", name)))
            }
            Err(e) => Err(persistence("create vault")(e)),
        }
    }

    /// Fetch a vault by name.
    pub fn get(&self, name: &str) -> AppResult<Vault> {
        self.find(name)?
            .ok_or_else(|| AppError::not_found("vault", name))
    }

    /// Fetch a vault by name, returning `None` if it does not exist.
    pub fn find(&self, name: &str) -> AppResult<Option<Vault>> {
        self.conn
            .query_row(
                "SELECT id, name, created_at FROM vaults WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Vault {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: timestamp_at(row, 2)?,
                    })
                },
            )
            .optional()
            .map_err(persistence("look up vault"))
    }

    /// All vaults, newest first.
    pub fn list(&self) -> AppResult<Vec<Vault>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM vaults ORDER BY created_at DESC, id DESC")
            .map_err(persistence("list vaults"))?;

        let vaults = stmt
            .query_map([], |row| {
                Ok(Vault {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: timestamp_at(row, 2)?,
                })
            })
            .map_err(persistence("list vaults"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(persistence("read vault row"))?;

        Ok(vaults)
    }

    /// Delete an empty vault.
    ///
    /// Returns the number of vaults removed (0 when the name is unknown).
    /// A vault that still holds prompts is rejected with `VaultNotEmpty`.
    pub fn delete(&self, name: &str) -> AppResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(persistence("begin transaction"))?;

        let Some(vault_id) = vault_id(&tx, name)? else {
            return Ok(0);
        };

        let prompt_count: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM prompts WHERE vault_id = ?1",
                params![vault_id],
                |row| row.get(0),
            )
            .map_err(persistence("count prompts"))?;

        if prompt_count > 0 {
            return Err(AppError::VaultNotEmpty(format!(
                "vault '{}' still contains {} prompt(s); use --force to delete them too",
                name, prompt_count
            )));
        }

        let removed = tx
            .execute("DELETE FROM vaults WHERE id = ?1", params![vault_id])
            .map_err(persistence("delete vault"))?;
        tx.commit().map_err(persistence("commit vault deletion"))?;

        tracing::debug!("Deleted vault '{}'", name);
        Ok(removed)
    }

    /// Delete a vault together with its prompts, versions and runs.
    ///
    /// Returns the number of vaults removed (0 when the name is unknown).
    pub fn delete_cascade(&self, name: &str) -> AppResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(persistence("begin transaction"))?;

        let Some(vault_id) = vault_id(&tx, name)? else {
            return Ok(0);
        };

        let runs = tx
            .execute(
                "DELETE FROM runs WHERE prompt_version_id IN (
                    SELECT pv.id FROM prompt_versions pv
                    JOIN prompts p ON pv.prompt_id = p.id
                    WHERE p.vault_id = ?1
                )",
                params![vault_id],
            )
            .map_err(persistence("delete runs"))?;

        let versions = tx
            .execute(
                "DELETE FROM prompt_versions WHERE prompt_id IN (
                    SELECT id FROM prompts WHERE vault_id = ?1
                )",
                params![vault_id],
            )
            .map_err(persistence("delete prompt versions"))?;

        let prompts = tx
            .execute("DELETE FROM prompts WHERE vault_id = ?1", params![vault_id])
            .map_err(persistence("delete prompts"))?;

        let removed = tx
            .execute("DELETE FROM vaults WHERE id = ?1", params![vault_id])
            .map_err(persistence("delete vault"))?;

        tx.commit().map_err(persistence("commit vault deletion"))?;

        tracing::debug!(
            "Deleted vault '{}' with {} prompts, {} versions, {} runs",
            name,
            prompts,
            versions,
            runs
        );
        Ok(removed)
    }
}

fn vault_id(conn: &Connection, name: &str) -> AppResult<Option<i64>> {
    conn.query_row(
        "SELECT id FROM vaults WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()
    .map_err(persistence("look up vault"))
}

#[cfg(test)]
mod tests {
    use crate::Store;
    use promptvault_core::AppError;

    #[test]
    fn test_create_and_get() {
        let store = Store::open_in_memory().unwrap();
        let created = store.vaults().create("demo").unwrap();

        let fetched = store.vaults().get("demo").unwrap();
        assert_eq!(created, fetched);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let store = Store::open_in_memory().unwrap();
        let original = store.vaults().create("demo").unwrap();

        let err = store.vaults().create("demo").unwrap_err();
        assert!(matches!(err, AppError::DuplicateName(_)));

        assert_eq!(store.vaults().get("demo").unwrap(), original);
        assert_eq!(store.vaults().list().unwrap(), vec![original]);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let store = Store::open_in_memory().unwrap();
        store.vaults().create("demo").unwrap();
        store.vaults().create("Demo").unwrap();

        assert_eq!(store.vaults().list().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_name_rejected() {
        let store = Store::open_in_memory().unwrap();
        let err = store.vaults().create("  ").unwrap_err();
        assert!(matches!(err, AppError::InvalidName(_)));
    }

    #[test]
    fn test_get_missing() {
        let store = Store::open_in_memory().unwrap();
        let err = store.vaults().get("nope").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_list_newest_first() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.vaults().list().unwrap().is_empty());

        store.vaults().create("first").unwrap();
        store.vaults().create("second").unwrap();

        let names: Vec<_> = store
            .vaults()
            .list()
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn test_delete_missing_returns_zero() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.vaults().delete("ghost").unwrap(), 0);
        assert_eq!(store.vaults().delete_cascade("ghost").unwrap(), 0);
    }

    #[test]
    fn test_delete_empty_vault() {
        let store = Store::open_in_memory().unwrap();
        store.vaults().create("demo").unwrap();

        assert_eq!(store.vaults().delete("demo").unwrap(), 1);
        assert!(store.vaults().find("demo").unwrap().is_none());
    }

    #[test]
    fn test_delete_non_empty_vault_rejected() {
        let store = Store::open_in_memory().unwrap();
        store.vaults().create("demo").unwrap();
        store.prompts().add("demo", "greet", "Hello").unwrap();

        let err = store.vaults().delete("demo").unwrap_err();
        assert!(matches!(err, AppError::VaultNotEmpty(_)));
        assert!(store.vaults().find("demo").unwrap().is_some());
    }

    #[test]
    fn test_delete_cascade_removes_everything() {
        let store = Store::open_in_memory().unwrap();
        store.vaults().create("demo").unwrap();
        store.vaults().create("other").unwrap();
        store.prompts().add("demo", "greet", "Hello").unwrap();
        let version = store.prompts().append_version("demo", "greet", "Hi").unwrap();
        store
            .runs()
            .append(version.id, "echo", "{}", "ok")
            .unwrap();
        store.prompts().add("other", "keep", "Stay").unwrap();

        assert_eq!(store.vaults().delete_cascade("demo").unwrap(), 1);

        let count = |table: &str| -> i64 {
            store
                .connection()
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .unwrap()
        };
        assert_eq!(count("vaults"), 1);
        assert_eq!(count("prompts"), 1);
        assert_eq!(count("prompt_versions"), 1);
        assert_eq!(count("runs"), 0);
    }
}
