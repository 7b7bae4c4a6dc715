//! SQLite-backed task store.

use anyhow::{Context as _, Result as AnyResult};
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::Mutex;

use crate::error::{Error, Result};

use super::{QueryMode, Task, TaskPatch, TaskStore, fresh_id};

const TASK_COLUMNS: &str = "id, title, description, due_date, done";

/// Durable task mapping behind a single connection. The mutex serializes
/// statements, which is what gives same-id races their last-writer-wins
/// floor.
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Open or create the task table at the given database path.
    pub fn open(path: &str) -> AnyResult<Self> {
        let conn = Connection::open(path).context("failed to open task database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                due_date    TEXT NOT NULL DEFAULT '',
                done        INTEGER NOT NULL DEFAULT 0
            )",
        )
        .context("failed to create tasks table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> AnyResult<Self> {
        Self::open(":memory:")
    }

    fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
        Ok(Task {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            due_date: row.get(3)?,
            done: row.get::<_, i64>(4)? != 0,
        })
    }
}

/// Escape LIKE wildcards so a pattern matches the query text literally.
/// Backslash is the declared escape character.
fn escape_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn create(&self, title: &str, description: &str, due_date: &str) -> Result<Task> {
        if title.is_empty() {
            return Err(Error::InvalidInput("title is required".to_string()));
        }
        let task = Task {
            id: fresh_id(),
            title: title.to_string(),
            description: description.to_string(),
            due_date: due_date.to_string(),
            done: false,
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tasks (id, title, description, due_date, done)
             VALUES (?1, ?2, ?3, ?4, 0)",
            [&task.id, &task.title, &task.description, &task.due_date],
        )?;
        Ok(task)
    }

    async fn list(&self) -> Result<Vec<Task>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY rowid ASC"
        ))?;
        let tasks = stmt
            .query_map([], Self::row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    async fn get_by_id(&self, id: &str) -> Result<Task> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"
        ))?;
        let mut rows = stmt.query_map([id], Self::row_to_task)?;
        match rows.next() {
            Some(task) => Ok(task?),
            None => Err(Error::NotFound(format!("task {id}"))),
        }
    }

    async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        // A record with an empty title must never be persisted, by create
        // or by update.
        if let Some(title) = &patch.title
            && title.is_empty()
        {
            return Err(Error::InvalidInput("title cannot be emptied".to_string()));
        }
        // Read-modify-write under one lock hold, so a concurrent patch on
        // the same id can't interleave mid-record.
        let conn = self.conn.lock().unwrap();
        let mut current = {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map([id], Self::row_to_task)?;
            match rows.next() {
                Some(task) => task?,
                None => return Err(Error::NotFound(format!("task {id}"))),
            }
        };

        if let Some(title) = patch.title {
            current.title = title;
        }
        if let Some(description) = patch.description {
            current.description = description;
        }
        if let Some(due_date) = patch.due_date {
            current.due_date = due_date;
        }
        if let Some(done) = patch.done {
            current.done = done;
        }

        conn.execute(
            "UPDATE tasks SET title = ?1, description = ?2, due_date = ?3, done = ?4
             WHERE id = ?5",
            rusqlite::params![
                current.title,
                current.description,
                current.due_date,
                current.done as i64,
                id
            ],
        )?;
        Ok(current)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(Error::NotFound(format!("task {id}")));
        }
        Ok(())
    }

    async fn search_by_title(&self, query: &str, mode: QueryMode) -> Result<Vec<Task>> {
        let conn = self.conn.lock().unwrap();
        let tasks = match mode {
            QueryMode::Parameterized => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE title LIKE ?1 ESCAPE '\\' ORDER BY rowid ASC"
                ))?;
                let pattern = format!("%{}%", escape_like(query));
                stmt.query_map([&pattern], Self::row_to_task)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            QueryMode::RawConcatenated => {
                // Deliberately vulnerable: the query text is spliced in
                // unescaped. Kept as an explicit opt-in path to demonstrate
                // the injection it enables.
                let sql = format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE title LIKE '%{query}%' ORDER BY rowid ASC"
                );
                let mut stmt = conn.prepare(&sql)?;
                stmt.query_map([], Self::row_to_task)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_store() -> SqliteTaskStore {
        SqliteTaskStore::in_memory().unwrap()
    }

    #[tokio::test]
    async fn create_rejects_empty_title() {
        let store = mem_store();
        let err = store.create("", "desc", "").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_round_trips_fields() {
        let store = mem_store();
        let task = store
            .create("Buy milk", "two liters", "2026-09-01")
            .await
            .unwrap();
        assert!(!task.id.is_empty());
        assert!(!task.done);

        let fetched = store.get_by_id(&task.id).await.unwrap();
        assert_eq!(fetched, task);
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let store = mem_store();
        let a = store.create("first", "", "").await.unwrap();
        let b = store.create("second", "", "").await.unwrap();
        let c = store.create("third", "", "").await.unwrap();

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = mem_store();
        let err = store.get_by_id("does-not-exist").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn update_applies_only_supplied_fields() {
        let store = mem_store();
        let task = store
            .create("Buy milk", "two liters", "2026-09-01")
            .await
            .unwrap();

        let updated = store
            .update(
                &task.id,
                TaskPatch {
                    done: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.done);
        assert_eq!(updated.title, "Buy milk");
        assert_eq!(updated.description, "two liters");
        assert_eq!(updated.due_date, "2026-09-01");
    }

    #[tokio::test]
    async fn update_can_clear_a_field_with_empty_string() {
        let store = mem_store();
        let task = store.create("t", "something", "").await.unwrap();
        let updated = store
            .update(
                &task.id,
                TaskPatch {
                    description: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description, "");
        assert_eq!(updated.title, "t");
    }

    #[tokio::test]
    async fn update_with_empty_patch_returns_record_unchanged() {
        let store = mem_store();
        let task = store.create("t", "d", "").await.unwrap();
        let updated = store.update(&task.id, TaskPatch::default()).await.unwrap();
        assert_eq!(updated, task);
    }

    #[tokio::test]
    async fn update_cannot_empty_the_title() {
        let store = mem_store();
        let task = store.create("keep me", "", "").await.unwrap();
        let err = store
            .update(
                &task.id,
                TaskPatch {
                    title: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert_eq!(store.get_by_id(&task.id).await.unwrap().title, "keep me");
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = mem_store();
        let err = store
            .update("nope", TaskPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn delete_twice_second_is_not_found() {
        let store = mem_store();
        let task = store.create("t", "", "").await.unwrap();
        store.delete(&task.id).await.unwrap();
        let err = store.delete(&task.id).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn parameterized_search_matches_substring() {
        let store = mem_store();
        store.create("Buy milk", "", "").await.unwrap();
        store.create("Buy bread", "", "").await.unwrap();
        store.create("Walk dog", "", "").await.unwrap();

        let hits = store
            .search_by_title("Buy", QueryMode::Parameterized)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn parameterized_search_treats_quote_literally() {
        let store = mem_store();
        store.create("Call O'Brien", "", "").await.unwrap();
        store.create("Call Smith", "", "").await.unwrap();

        let hits = store
            .search_by_title("O'Brien", QueryMode::Parameterized)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Call O'Brien");
    }

    #[tokio::test]
    async fn parameterized_search_treats_wildcards_literally() {
        let store = mem_store();
        store.create("100% done", "", "").await.unwrap();
        store.create("fully done", "", "").await.unwrap();

        let hits = store
            .search_by_title("100%", QueryMode::Parameterized)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        // A bare "%" as the query must not match everything.
        let hits = store
            .search_by_title("%", QueryMode::Parameterized)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "100% done");
    }

    #[tokio::test]
    async fn raw_search_is_injectable() {
        let store = mem_store();
        store.create("Buy milk", "", "").await.unwrap();
        store.create("secret plans", "", "").await.unwrap();

        // Terminates the LIKE literal and ORs in a match-everything clause:
        // the spliced text becomes  title LIKE '%zzz%' OR title LIKE '%%'.
        let crafted = "zzz%' OR title LIKE '%";
        let hits = store
            .search_by_title(crafted, QueryMode::RawConcatenated)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);

        // The same input through the safe path matches nothing.
        let hits = store
            .search_by_title(crafted, QueryMode::Parameterized)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn raw_search_with_stray_quote_errors() {
        let store = mem_store();
        store.create("Call O'Brien", "", "").await.unwrap();
        // The unescaped quote breaks the SQL text; that failure is part of
        // what the raw path demonstrates.
        let err = store
            .search_by_title("O'Brien", QueryMode::RawConcatenated)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "internal");
    }

    #[tokio::test]
    async fn persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks-test.db");
        let path_str = path.to_str().unwrap();

        let id = {
            let store = SqliteTaskStore::open(path_str).unwrap();
            store.create("persisted", "", "").await.unwrap().id
        };

        {
            let store = SqliteTaskStore::open(path_str).unwrap();
            let task = store.get_by_id(&id).await.unwrap();
            assert_eq!(task.title, "persisted");
        }
    }
}
