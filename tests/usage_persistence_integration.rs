//! Persistence tests: usage stats and conversation cache across store
//! instances backed by the same database file

use tempfile::tempdir;

use chatledger::config::UsageConfig;
use chatledger::ledger::{StatsStore, UsageLedger};
use chatledger::session::ChatMessage;
use chatledger::storage::SqliteStore;

#[test]
fn test_usage_stats_survive_reopen() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("chatledger.db");

    {
        let store = SqliteStore::new_with_path(&db_path).expect("create store");
        let mut ledger =
            UsageLedger::load(Box::new(store), &UsageConfig::default()).expect("load ledger");
        ledger.record_user_message("hello").expect("record user");
        ledger
            .record_ai_message(&ChatMessage::assistant("hi there friend"), "llama-3.1-8b-instant")
            .expect("record ai");
    }

    // A fresh store over the same file sees the accumulated stats
    let store = SqliteStore::new_with_path(&db_path).expect("reopen store");
    let ledger =
        UsageLedger::load(Box::new(store), &UsageConfig::default()).expect("reload ledger");
    let stats = ledger.stats();

    assert_eq!(stats.total_messages, 2);
    assert_eq!(stats.user_messages, 1);
    assert_eq!(stats.ai_messages, 1);
    assert!(stats.total_tokens > 0);
    assert_eq!(stats.models_used.get("llama-3.1-8b-instant"), Some(&1));
}

#[test]
fn test_reset_persists_across_reopen() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("chatledger.db");

    {
        let store = SqliteStore::new_with_path(&db_path).expect("create store");
        let mut ledger =
            UsageLedger::load(Box::new(store), &UsageConfig::default()).expect("load ledger");
        ledger.record_user_message("hello").expect("record user");
        ledger.reset().expect("reset");
    }

    let store = SqliteStore::new_with_path(&db_path).expect("reopen store");
    let ledger =
        UsageLedger::load(Box::new(store), &UsageConfig::default()).expect("reload ledger");
    assert_eq!(ledger.stats().total_messages, 0);
}

#[test]
fn test_empty_database_starts_at_zero() {
    let dir = tempdir().expect("tempdir");
    let store =
        SqliteStore::new_with_path(dir.path().join("chatledger.db")).expect("create store");

    assert!(StatsStore::load(&store).expect("load").is_none());

    let ledger =
        UsageLedger::load(Box::new(store), &UsageConfig::default()).expect("load ledger");
    assert_eq!(ledger.stats().total_messages, 0);
    assert_eq!(ledger.stats().estimated_cost, 0.0);
}

#[test]
fn test_selected_model_survives_reopen() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("chatledger.db");

    {
        let store = SqliteStore::new_with_path(&db_path).expect("create store");
        store
            .set_selected_model("qwen/qwen3-32b")
            .expect("set model");
    }

    let store = SqliteStore::new_with_path(&db_path).expect("reopen store");
    assert_eq!(
        store.selected_model().expect("get model").as_deref(),
        Some("qwen/qwen3-32b")
    );
}

#[test]
fn test_conversation_cache_roundtrip_across_reopen() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("chatledger.db");
    let id = "21173421-201f-4e56-87a0-8e13fc02f7e5";

    {
        let store = SqliteStore::new_with_path(&db_path).expect("create store");
        let messages = vec![
            ChatMessage::user("How do lifetimes work?"),
            ChatMessage::assistant("Lifetimes bound borrows."),
        ];
        store
            .save_conversation(id, "How do lifetimes work?", Some("llama-3.1-8b-instant"), &messages)
            .expect("save conversation");
    }

    let store = SqliteStore::new_with_path(&db_path).expect("reopen store");

    // Prefix lookup resolves to the full stored record
    let (full_id, title, model, messages) = store
        .load_conversation("21173421")
        .expect("load conversation")
        .expect("conversation missing");
    assert_eq!(full_id, id);
    assert_eq!(title, "How do lifetimes work?");
    assert_eq!(model.as_deref(), Some("llama-3.1-8b-instant"));
    assert_eq!(messages.len(), 2);

    let listed = store.list_conversations().expect("list conversations");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].message_count, 2);

    store.delete_conversation("21173421").expect("delete");
    assert!(store
        .load_conversation(id)
        .expect("load after delete")
        .is_none());
}

#[test]
fn test_stats_and_conversations_share_one_database() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("chatledger.db");
    let store = SqliteStore::new_with_path(&db_path).expect("create store");

    let mut ledger =
        UsageLedger::load(Box::new(store.clone()), &UsageConfig::default()).expect("load ledger");
    ledger.record_user_message("hi").expect("record user");

    store
        .save_conversation("conv-1", "hi", None, &[ChatMessage::user("hi")])
        .expect("save conversation");

    // Both live in the same file
    assert!(db_path.exists());
    assert_eq!(store.list_conversations().expect("list").len(), 1);
    assert_eq!(
        StatsStore::load(&store)
            .expect("load stats")
            .expect("stats missing")
            .user_messages,
        1
    );
}
