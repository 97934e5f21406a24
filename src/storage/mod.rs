//! SQLite-backed persistence
//!
//! One database file holds two tables: `conversations` caches full
//! transcripts as JSON, and `kv` stores small singleton values (the usage
//! statistics blob and the selected model). Connections are opened per
//! operation; the file lives in the platform data directory unless
//! overridden.

use crate::error::{ChatLedgerError, Result};
use crate::ledger::{StatsStore, UsageStats};
use crate::session::ChatMessage;
use anyhow::Context;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

pub mod types;
pub use types::StoredConversation;

/// Key under which the usage statistics blob is stored
const USAGE_STATS_KEY: &str = "usage_stats";
/// Key under which the selected model identifier is stored
const SELECTED_MODEL_KEY: &str = "selected_model";

/// Alias for a loaded conversation record: (id, title, model, messages).
/// The full id is returned so prefix lookups can be written back.
type LoadedConversation = (String, String, Option<String>, Vec<ChatMessage>);

/// SQLite store for conversations, usage stats, and settings
#[derive(Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open the store in the user's data directory
    ///
    /// The `CHATLEDGER_DB` environment variable overrides the path, which
    /// makes it easy to point the binary at a test database or an
    /// alternate file without touching the user's data dir.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("CHATLEDGER_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("io", "chatledger", "chatledger").ok_or_else(|| {
            ChatLedgerError::Storage("could not determine data directory".into())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("failed to create data directory")
            .map_err(|e| ChatLedgerError::Storage(e.to_string()))?;

        Self::open(data_dir.join("chatledger.db"))
    }

    /// Open the store at an explicit database path
    ///
    /// Primarily useful for tests, where a temporary directory replaces
    /// the application data directory.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatledger::storage::SqliteStore;
    ///
    /// let store = SqliteStore::new_with_path("/tmp/test_chatledger.db").unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        // The parent directory must exist before sqlite can create the file.
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("failed to create parent directory for database")
                .map_err(|e| ChatLedgerError::Storage(e.to_string()))?;
        }

        Self::open(db_path)
    }

    fn open(db_path: PathBuf) -> Result<Self> {
        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("failed to open database")
            .map_err(|e| ChatLedgerError::Storage(e.to_string()).into())
    }

    /// Initialize the schema
    fn init(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                model TEXT,
                messages JSON NOT NULL
            );
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .context("failed to create tables")
        .map_err(|e| ChatLedgerError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Save or update a conversation
    ///
    /// Updating preserves `created_at` and bumps `updated_at`.
    pub fn save_conversation(
        &self,
        id: &str,
        title: &str,
        model: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<()> {
        let conn = self.connect()?;

        let messages_json = serde_json::to_string(messages)
            .context("failed to serialize messages")
            .map_err(|e| ChatLedgerError::Storage(e.to_string()))?;

        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO conversations (id, title, created_at, updated_at, model, messages)
            VALUES (?1, ?2, ?3, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                updated_at = excluded.updated_at,
                model = excluded.model,
                messages = excluded.messages",
            params![id, title, now, model, messages_json],
        )
        .context("failed to save conversation")
        .map_err(|e| ChatLedgerError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Load a conversation by ID (full UUID or unique prefix)
    pub fn load_conversation(&self, id: &str) -> Result<Option<LoadedConversation>> {
        let conn = self.connect()?;

        let (query, search_param) = Self::id_match(
            id,
            "SELECT id, title, model, messages FROM conversations WHERE id = ?",
            "SELECT id, title, model, messages FROM conversations WHERE id LIKE ?",
        );

        let result = conn
            .query_row(query, params![search_param], |row| {
                let full_id: String = row.get(0)?;
                let title: String = row.get(1)?;
                let model: Option<String> = row.get(2)?;
                let messages_json: String = row.get(3)?;
                Ok((full_id, title, model, messages_json))
            })
            .optional()
            .context("failed to query conversation")
            .map_err(|e| ChatLedgerError::Storage(e.to_string()))?;

        match result {
            Some((full_id, title, model, messages_json)) => {
                let messages: Vec<ChatMessage> = serde_json::from_str(&messages_json)
                    .context("failed to deserialize messages")
                    .map_err(|e| ChatLedgerError::Storage(e.to_string()))?;
                Ok(Some((full_id, title, model, messages)))
            }
            None => Ok(None),
        }
    }

    /// List stored conversations, most recently updated first
    pub fn list_conversations(&self) -> Result<Vec<StoredConversation>> {
        let conn = self.connect()?;

        let mut stmt = conn
            .prepare(
                "SELECT id, title, created_at, updated_at, model, messages
                FROM conversations
                ORDER BY updated_at DESC",
            )
            .context("failed to prepare statement")
            .map_err(|e| ChatLedgerError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let title: String = row.get(1)?;
                let created_at_str: String = row.get(2)?;
                let updated_at_str: String = row.get(3)?;
                let model: Option<String> = row.get(4)?;
                let messages_json: String = row.get(5)?;

                let created_at = parse_timestamp(&created_at_str);
                let updated_at = parse_timestamp(&updated_at_str);

                // Counting via serde_json::Value avoids deserializing full
                // message structs for the list view.
                let message_count = serde_json::from_str::<serde_json::Value>(&messages_json)
                    .ok()
                    .and_then(|v| v.as_array().map(|a| a.len()))
                    .unwrap_or(0);

                Ok(StoredConversation {
                    id,
                    title,
                    created_at,
                    updated_at,
                    model,
                    message_count,
                })
            })
            .context("failed to query conversations")
            .map_err(|e| ChatLedgerError::Storage(e.to_string()))?;

        let mut conversations = Vec::new();
        for row in rows.flatten() {
            conversations.push(row);
        }

        Ok(conversations)
    }

    /// Delete a conversation (full UUID or unique prefix); idempotent
    pub fn delete_conversation(&self, id: &str) -> Result<()> {
        let conn = self.connect()?;

        let (query, param) = Self::id_match(
            id,
            "DELETE FROM conversations WHERE id = ?",
            "DELETE FROM conversations WHERE id LIKE ?",
        );

        conn.execute(query, params![param])
            .context("failed to delete conversation")
            .map_err(|e| ChatLedgerError::Storage(e.to_string()))?;

        Ok(())
    }

    /// The model identifier persisted by `models use`, if any
    pub fn selected_model(&self) -> Result<Option<String>> {
        self.kv_get(SELECTED_MODEL_KEY)
    }

    /// Persist the model identifier used for future sessions
    pub fn set_selected_model(&self, model: &str) -> Result<()> {
        self.kv_set(SELECTED_MODEL_KEY, model)
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        conn.query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
            row.get(0)
        })
        .optional()
        .context("failed to read kv entry")
        .map_err(|e| ChatLedgerError::Storage(e.to_string()).into())
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .context("failed to write kv entry")
        .map_err(|e| ChatLedgerError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Full-UUID lookups match exactly; shorter inputs match as a prefix
    fn id_match(id: &str, exact: &'static str, prefix: &'static str) -> (&'static str, String) {
        if id.len() == 36 {
            (exact, id.to_string())
        } else {
            (prefix, format!("{}%", id))
        }
    }
}

impl StatsStore for SqliteStore {
    fn load(&self) -> Result<Option<UsageStats>> {
        match self.kv_get(USAGE_STATS_KEY)? {
            Some(json) => {
                let stats = serde_json::from_str(&json)
                    .context("failed to deserialize usage stats")
                    .map_err(|e| ChatLedgerError::Storage(e.to_string()))?;
                Ok(Some(stats))
            }
            None => Ok(None),
        }
    }

    fn save(&self, stats: &UsageStats) -> Result<()> {
        let json = serde_json::to_string(stats)
            .context("failed to serialize usage stats")
            .map_err(|e| ChatLedgerError::Storage(e.to_string()))?;
        self.kv_set(USAGE_STATS_KEY, &json)
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Helper: store backed by a temp directory. Returns the `TempDir` so
    /// the caller keeps it alive for the test's duration.
    fn create_test_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("chatledger.db");
        let store = SqliteStore::new_with_path(db_path).expect("failed to create store");
        (store, dir)
    }

    #[test]
    fn test_init_creates_tables() {
        let (store, _dir) = create_test_store();
        let conn = Connection::open(&store.db_path).expect("open connection");
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table'
                AND name IN ('conversations', 'kv')",
                [],
                |r| r.get(0),
            )
            .expect("query row");
        assert_eq!(count, 2);
    }

    #[test]
    fn test_save_and_load_conversation() {
        let (store, _dir) = create_test_store();
        let messages = vec![
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi there"),
        ];

        store
            .save_conversation("conv-1", "Hello", Some("llama-3.1-8b-instant"), &messages)
            .expect("save failed");

        let (id, title, model, loaded) = store
            .load_conversation("conv-1")
            .expect("load failed")
            .expect("conversation missing");
        assert_eq!(id, "conv-1");
        assert_eq!(title, "Hello");
        assert_eq!(model.as_deref(), Some("llama-3.1-8b-instant"));
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content, "Hello");
    }

    #[test]
    fn test_save_updates_and_preserves_created_at() {
        let (store, _dir) = create_test_store();
        let id = "conv-update";
        store
            .save_conversation(id, "Original", None, &[ChatMessage::user("1")])
            .expect("save failed");

        let first = store
            .list_conversations()
            .expect("list failed")
            .into_iter()
            .find(|c| c.id == id)
            .expect("row missing");

        sleep(Duration::from_millis(10));
        store
            .save_conversation(id, "Updated", None, &[ChatMessage::user("2")])
            .expect("update failed");

        let second = store
            .list_conversations()
            .expect("list failed")
            .into_iter()
            .find(|c| c.id == id)
            .expect("row missing after update");

        assert_eq!(second.title, "Updated");
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[test]
    fn test_load_missing_returns_none() {
        let (store, _dir) = create_test_store();
        assert!(store
            .load_conversation("no-such-id")
            .expect("load failed")
            .is_none());
    }

    #[test]
    fn test_list_orders_by_updated_at_desc() {
        let (store, _dir) = create_test_store();
        store
            .save_conversation("first", "A", None, &[ChatMessage::user("a")])
            .expect("save failed");
        sleep(Duration::from_millis(10));
        store
            .save_conversation("second", "B", None, &[ChatMessage::user("b")])
            .expect("save failed");

        let rows = store.list_conversations().expect("list failed");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "second");
        assert_eq!(rows[1].id, "first");
    }

    #[test]
    fn test_message_count_matches_transcript() {
        let (store, _dir) = create_test_store();
        let messages = vec![
            ChatMessage::user("a"),
            ChatMessage::assistant("b"),
            ChatMessage::user("c"),
        ];
        store
            .save_conversation("counted", "Counted", None, &messages)
            .expect("save failed");

        let rows = store.list_conversations().expect("list failed");
        assert_eq!(rows[0].message_count, 3);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (store, _dir) = create_test_store();
        store
            .save_conversation("doomed", "Doomed", None, &[ChatMessage::user("x")])
            .expect("save failed");

        store.delete_conversation("doomed").expect("delete failed");
        store
            .delete_conversation("doomed")
            .expect("second delete failed");
        assert!(store
            .load_conversation("doomed")
            .expect("load failed")
            .is_none());
    }

    #[test]
    fn test_prefix_lookup_and_delete() {
        let (store, _dir) = create_test_store();
        let full_id = "abcdef12-3456-7890-abcd-ef1234567890";
        store
            .save_conversation(full_id, "Prefixed", None, &[ChatMessage::user("x")])
            .expect("save failed");

        let loaded = store
            .load_conversation("abcdef12")
            .expect("load by prefix failed")
            .expect("conversation missing");
        // A prefix lookup returns the full stored id
        assert_eq!(loaded.0, full_id);

        store
            .delete_conversation("abcdef12")
            .expect("delete by prefix failed");
        assert!(store
            .load_conversation(full_id)
            .expect("load failed")
            .is_none());
    }

    #[test]
    fn test_usage_stats_roundtrip() {
        let (store, _dir) = create_test_store();
        assert!(StatsStore::load(&store).expect("load failed").is_none());

        let mut stats = UsageStats::default();
        stats.total_messages = 6;
        stats.user_messages = 3;
        stats.ai_messages = 3;
        stats.total_tokens = 4500;
        stats.estimated_cost = 0.012;
        stats.models_used.insert("llama-3.1-8b-instant".into(), 3);

        StatsStore::save(&store, &stats).expect("save failed");
        let loaded = StatsStore::load(&store)
            .expect("load failed")
            .expect("stats missing");
        assert_eq!(loaded, stats);
    }

    #[test]
    fn test_selected_model_roundtrip() {
        let (store, _dir) = create_test_store();
        assert!(store.selected_model().expect("get failed").is_none());

        store
            .set_selected_model("qwen/qwen3-32b")
            .expect("set failed");
        assert_eq!(
            store.selected_model().expect("get failed").as_deref(),
            Some("qwen/qwen3-32b")
        );

        store
            .set_selected_model("openai/gpt-oss-20b")
            .expect("overwrite failed");
        assert_eq!(
            store.selected_model().expect("get failed").as_deref(),
            Some("openai/gpt-oss-20b")
        );
    }

    #[test]
    #[serial]
    fn test_new_respects_env_override() {
        // Nested path exercises parent directory creation.
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("nested").join("chatledger.db");
        env::set_var("CHATLEDGER_DB", db_path.to_string_lossy().to_string());

        let store = SqliteStore::new().expect("new failed with env override");
        assert_eq!(store.db_path, db_path);
        assert!(db_path.parent().unwrap().exists());

        env::remove_var("CHATLEDGER_DB");
    }
}
