//! Run ledger: append-only record of executions.

use promptvault_core::{AppError, AppResult};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::db::{now_timestamp, persistence, timestamp_at};
use crate::types::Run;

/// Maximum number of runs returned by [`RunLedger::list`].
pub const RUN_LIST_LIMIT: usize = 20;

const RUN_SELECT: &str = "SELECT r.id, r.prompt_version_id, v.name, p.name, pv.version,
        r.provider, r.params, r.response, r.created_at
    FROM runs r
    JOIN prompt_versions pv ON r.prompt_version_id = pv.id
    JOIN prompts p ON pv.prompt_id = p.id
    JOIN vaults v ON p.vault_id = v.id";

pub struct RunLedger<'a> {
    conn: &'a Connection,
}

impl<'a> RunLedger<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Record one execution against a stored version.
    pub fn append(
        &self,
        prompt_version_id: i64,
        provider: &str,
        params_json: &str,
        response: &str,
    ) -> AppResult<Run> {
        let (_, stamp) = now_timestamp();

        self.conn
            .execute(
                "INSERT INTO runs (prompt_version_id, provider, params, response, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![prompt_version_id, provider, params_json, response, stamp],
            )
            .map_err(persistence("record run"))?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!("Recorded run {} for version id {}", id, prompt_version_id);
        self.get(id)
    }

    /// Most recent runs, newest first, optionally narrowed to a vault and/or
    /// a prompt name. At most [`RUN_LIST_LIMIT`] entries are returned.
    pub fn list(&self, vault: Option<&str>, prompt: Option<&str>) -> AppResult<Vec<Run>> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(vault) = vault {
            clauses.push("v.name = ?");
            values.push(vault);
        }
        if let Some(prompt) = prompt {
            clauses.push("p.name = ?");
            values.push(prompt);
        }

        let mut sql = RUN_SELECT.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(
            " ORDER BY r.created_at DESC, r.id DESC LIMIT {}",
            RUN_LIST_LIMIT
        ));

        let mut stmt = self.conn.prepare(&sql).map_err(persistence("list runs"))?;
        let runs = stmt
            .query_map(params_from_iter(values), row_to_run)
            .map_err(persistence("list runs"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(persistence("read run row"))?;

        Ok(runs)
    }

    /// Fetch one run by id.
    pub fn get(&self, id: i64) -> AppResult<Run> {
        let sql = format!("{} WHERE r.id = ?1", RUN_SELECT);
        self.conn
            .query_row(&sql, params![id], row_to_run)
            .optional()
            .map_err(persistence("read run"))?
            .ok_or_else(|| AppError::not_found("run", id))
    }
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<Run> {
    Ok(Run {
        id: row.get(0)?,
        prompt_version_id: row.get(1)?,
        vault_name: row.get(2)?,
        prompt_name: row.get(3)?,
        version: row.get(4)?,
        provider: row.get(5)?,
        params: row.get(6)?,
        response: row.get(7)?,
        created_at: timestamp_at(row, 8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::RUN_LIST_LIMIT;
    use crate::Store;
    use promptvault_core::AppError;

    fn seeded() -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        store.vaults().create("demo").unwrap();
        let prompt = store.prompts().add("demo", "greet", "Hello").unwrap();
        let version_id = store.prompts().content_latest(prompt.id).unwrap().version_id;
        (store, version_id)
    }

    #[test]
    fn test_append_and_get() {
        let (store, version_id) = seeded();
        let run = store
            .runs()
            .append(version_id, "ollama", r#"{"model":"llama3"}"#, "Hi!")
            .unwrap();

        assert_eq!(run.prompt_name, "greet");
        assert_eq!(run.vault_name, "demo");
        assert_eq!(run.version, 1);
        assert_eq!(run.response, "Hi!");
        assert_eq!(run.params_json().unwrap()["model"], "llama3");

        assert_eq!(store.runs().get(run.id).unwrap(), run);
    }

    #[test]
    fn test_get_missing() {
        let (store, _) = seeded();
        assert!(matches!(store.runs().get(42).unwrap_err(), AppError::NotFound(_)));
    }

    #[test]
    fn test_append_to_unknown_version_fails() {
        let (store, _) = seeded();
        let err = store.runs().append(999, "ollama", "{}", "x").unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
    }

    #[test]
    fn test_list_limit_and_order() {
        let (store, version_id) = seeded();
        for i in 0..(RUN_LIST_LIMIT + 5) {
            store
                .runs()
                .append(version_id, "ollama", "{}", &format!("r{}", i))
                .unwrap();
        }

        let runs = store.runs().list(None, None).unwrap();
        assert_eq!(runs.len(), RUN_LIST_LIMIT);
        assert_eq!(runs[0].response, format!("r{}", RUN_LIST_LIMIT + 4));
    }

    #[test]
    fn test_list_filters() {
        let (store, greet_version) = seeded();
        store.vaults().create("other").unwrap();
        let other = store.prompts().add("other", "greet", "Yo").unwrap();
        let other_version = store.prompts().content_latest(other.id).unwrap().version_id;
        let bye = store.prompts().add("demo", "bye", "Bye").unwrap();
        let bye_version = store.prompts().content_latest(bye.id).unwrap().version_id;

        store.runs().append(greet_version, "ollama", "{}", "a").unwrap();
        store.runs().append(other_version, "ollama", "{}", "b").unwrap();
        store.runs().append(bye_version, "ollama", "{}", "c").unwrap();

        assert_eq!(store.runs().list(Some("demo"), None).unwrap().len(), 2);
        assert_eq!(store.runs().list(None, Some("greet")).unwrap().len(), 2);

        let runs = store.runs().list(Some("demo"), Some("greet")).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].response, "a");

        assert!(store.runs().list(Some("nope"), None).unwrap().is_empty());
    }
}
