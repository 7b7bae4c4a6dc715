pub mod sqlite;

use async_trait::async_trait;
use rand::RngExt;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A task record. The id is opaque, assigned at creation, immutable after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub done: bool,
}

/// A partial update: only the fields that are `Some` are applied, absent
/// fields leave the record untouched. Present-but-empty strings do clear
/// a field; absence and emptiness are different things here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub done: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.done.is_none()
    }
}

/// How a title search builds its query text.
///
/// `RawConcatenated` splices the caller's query straight into the SQL with
/// no escaping. It exists on purpose (the project demonstrates the
/// injection it enables) and must stay an explicit, opt-in variant, never
/// a default anything falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    #[default]
    Parameterized,
    RawConcatenated,
}

impl QueryMode {
    /// Map the caller-facing `unsafe` flag to a mode.
    pub fn from_unsafe_flag(unsafe_query: bool) -> Self {
        if unsafe_query {
            QueryMode::RawConcatenated
        } else {
            QueryMode::Parameterized
        }
    }
}

/// Owns task records, their identity, and field-level mutation semantics.
///
/// Concurrency contract: operations on different ids are independent;
/// same-id races get at least last-writer-wins, never a corrupted record.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Fails with `InvalidInput` on an empty title; otherwise persists a
    /// fresh record with `done = false` and returns it.
    async fn create(&self, title: &str, description: &str, due_date: &str) -> Result<Task>;

    /// All tasks, in insertion order. Stable within one process lifetime;
    /// no stronger ordering is promised.
    async fn list(&self) -> Result<Vec<Task>>;

    /// Fails with `NotFound` when no record has this id.
    async fn get_by_id(&self, id: &str) -> Result<Task>;

    /// Applies the patch and returns the full post-update record.
    /// Fails with `NotFound` when no record has this id.
    async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task>;

    /// Irreversibly removes the record. Fails with `NotFound` when absent.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Title substring search. `Parameterized` matches literally;
    /// `RawConcatenated` is the deliberate injection path.
    async fn search_by_title(&self, query: &str, mode: QueryMode) -> Result<Vec<Task>>;
}

/// Allocate a fresh opaque task id: 16 random bytes, hex-encoded.
pub fn fresh_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    let mut id = String::with_capacity(32);
    for b in bytes {
        id.push_str(&format!("{b:02x}"));
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique_and_hex() {
        let a = fresh_id();
        let b = fresh_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn query_mode_defaults_to_parameterized() {
        assert_eq!(QueryMode::default(), QueryMode::Parameterized);
        assert_eq!(QueryMode::from_unsafe_flag(false), QueryMode::Parameterized);
        assert_eq!(
            QueryMode::from_unsafe_flag(true),
            QueryMode::RawConcatenated
        );
    }

    #[test]
    fn empty_patch_is_empty() {
        assert!(TaskPatch::default().is_empty());
        let patch = TaskPatch {
            done: Some(true),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn patch_deserializes_absent_fields_as_none() {
        let patch: TaskPatch = serde_json::from_str(r#"{"done": true}"#).unwrap();
        assert_eq!(patch.done, Some(true));
        assert!(patch.title.is_none());
        assert!(patch.description.is_none());
        assert!(patch.due_date.is_none());
    }

    #[test]
    fn patch_distinguishes_empty_from_absent() {
        let patch: TaskPatch = serde_json::from_str(r#"{"description": ""}"#).unwrap();
        assert_eq!(patch.description, Some(String::new()));
        assert!(patch.title.is_none());
    }
}
