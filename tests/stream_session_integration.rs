//! End-to-end chat turn tests against a mock streaming endpoint

use serde_json::json;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatledger::client::CompletionClient;
use chatledger::config::{ApiConfig, ChatConfig, UsageConfig};
use chatledger::ledger::UsageLedger;
use chatledger::session::{ChatSession, Conversation, Role, TurnOutcome};
use chatledger::storage::SqliteStore;

fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        endpoint: format!("{}/api/search/chat", server.uri()),
        ..ApiConfig::default()
    }
}

fn session_against(server: &MockServer, dir: &tempfile::TempDir) -> ChatSession {
    let api = api_config(server);
    let store = SqliteStore::new_with_path(dir.path().join("chatledger.db"))
        .expect("create store");
    let ledger =
        UsageLedger::load(Box::new(store), &UsageConfig::default()).expect("load ledger");
    let client = CompletionClient::new(&api).expect("create client");
    ChatSession::new(
        Box::new(client),
        api,
        Conversation::new(&ChatConfig::default()),
        ledger,
    )
}

fn sse_body(lines: &[&str]) -> String {
    let mut body = String::new();
    for line in lines {
        body.push_str(line);
        body.push('\n');
    }
    body
}

#[tokio::test]
async fn test_chat_turn_end_to_end() {
    let server = MockServer::start().await;

    let body = sse_body(&[
        r#"data: {"content":"The answer "}"#,
        r#"data: {"content":"is 42."}"#,
        r#"data: {"metadata":{"executedTools":["web_search"],"usageBreakdown":{"models":[{"model":"llama-3.1-8b-instant","usage":{"promptTokens":1000000,"completionTokens":500000,"totalTokens":1500000}}]}}}"#,
        "data: [DONE]",
    ]);

    Mock::given(method("POST"))
        .and(path("/api/search/chat"))
        .and(body_partial_json(json!({
            "message": "what is the answer?",
            "model": "llama-3.1-8b-instant"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().expect("tempdir");
    let mut session = session_against(&server, &dir);

    let mut streamed = String::new();
    let outcome = session
        .send_turn("what is the answer?", CancellationToken::new(), |delta| {
            streamed.push_str(delta)
        })
        .await
        .expect("turn failed");

    let message = match outcome {
        TurnOutcome::Completed { message, .. } => message,
        TurnOutcome::Cancelled => panic!("turn was cancelled"),
    };

    assert_eq!(message.content, "The answer is 42.");
    assert_eq!(streamed, "The answer is 42.");

    let meta = message.metadata.expect("metadata missing");
    assert_eq!(meta.executed_tools, vec!["web_search"]);
    assert_eq!(meta.usage_breakdown[0].total_tokens, 1_500_000);

    let stats = session.ledger().stats();
    assert_eq!(stats.total_messages, 2);
    assert_eq!(stats.total_tokens, 1_500_000);
    // 1M prompt at $0.05/M plus 500k completion at $0.08/M
    assert!((stats.estimated_cost - 0.09).abs() < 1e-12);
}

#[tokio::test]
async fn test_malformed_lines_are_skipped_not_fatal() {
    let server = MockServer::start().await;

    let body = sse_body(&[
        r#"data: {"content":"Hello"}"#,
        "data: {not json at all",
        ": comment line",
        r#"data: {"content":" world"}"#,
        "data: [DONE]",
    ]);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let dir = tempdir().expect("tempdir");
    let mut session = session_against(&server, &dir);

    let outcome = session
        .send_turn("hi", CancellationToken::new(), |_| {})
        .await
        .expect("turn failed");

    match outcome {
        TurnOutcome::Completed {
            message,
            skipped_records,
        } => {
            assert_eq!(message.content, "Hello world");
            assert!(skipped_records > 0);
        }
        TurnOutcome::Cancelled => panic!("turn was cancelled"),
    }
}

#[tokio::test]
async fn test_non_success_status_fails_the_turn() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let dir = tempdir().expect("tempdir");
    let mut session = session_against(&server, &dir);

    let result = session
        .send_turn("hi", CancellationToken::new(), |_| {})
        .await;

    assert!(result.is_err());
    let rendered = format!("{}", result.unwrap_err());
    assert!(rendered.contains("500"), "unexpected error: {rendered}");

    // The user message stays; no assistant message was recorded
    assert_eq!(session.conversation().len(), 1);
    assert_eq!(session.conversation().messages()[0].role, Role::User);
    assert_eq!(session.ledger().stats().ai_messages, 0);
}

#[tokio::test]
async fn test_history_travels_in_camelcase_field() {
    let server = MockServer::start().await;

    let body = sse_body(&[r#"data: {"content":"ok"}"#, "data: [DONE]"]);
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.clone(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let dir = tempdir().expect("tempdir");
    let mut session = session_against(&server, &dir);

    session
        .send_turn("first question", CancellationToken::new(), |_| {})
        .await
        .expect("first turn failed");

    // The second request must carry the first exchange as history
    server.reset().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "message": "second question",
            "conversationHistory": [
                {"role": "user", "content": "first question"},
                {"role": "assistant", "content": "ok"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    session
        .send_turn("second question", CancellationToken::new(), |_| {})
        .await
        .expect("second turn failed");
}

#[tokio::test]
async fn test_content_after_done_sentinel_is_ignored() {
    let server = MockServer::start().await;

    let body = sse_body(&[
        r#"data: {"content":"kept"}"#,
        "data: [DONE]",
        r#"data: {"content":" dropped"}"#,
    ]);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let dir = tempdir().expect("tempdir");
    let mut session = session_against(&server, &dir);

    let outcome = session
        .send_turn("hi", CancellationToken::new(), |_| {})
        .await
        .expect("turn failed");

    match outcome {
        TurnOutcome::Completed { message, .. } => assert_eq!(message.content, "kept"),
        TurnOutcome::Cancelled => panic!("turn was cancelled"),
    }
}
