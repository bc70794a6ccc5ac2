//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the REST API and drive the full
//! crawl cycle end-to-end through the HTTP provider.

use reply_mesh::config::{ApiConfig, Config, CrawlerConfig, OutputConfig, TargetConfig};
use reply_mesh::crawler::{run_crawl, Edge};
use reply_mesh::provider::{AccountProvider, PageOutcome, ThreadProvider, TwitterClient};
use reply_mesh::provider::{Account, ProviderError, ReplyQuery};
use reply_mesh::storage::{open_storage, RunStatus, Storage};
use reply_mesh::MeshError;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, dir: &TempDir, max_workers: usize) -> Config {
    let out = |name: &str| dir.path().join(name).to_string_lossy().into_owned();
    Config {
        target: TargetConfig {
            post_id: "42".to_string(),
            author: "alice".to_string(),
        },
        api: ApiConfig {
            base_url: base_url.to_string(),
            bearer_token_env: "REPLY_MESH_TEST_TOKEN_UNSET".to_string(),
            request_timeout_secs: 5,
        },
        crawler: CrawlerConfig {
            cooldown_ms: 10, // Very short for testing
            max_replies: 1000,
            max_workers,
            replies_page_size: 100,
            follows_page_size: 200,
        },
        output: OutputConfig {
            edges_path: out("allRelationships.csv"),
            error_log_path: out("errorFile.txt"),
            dump_dir: out("follows"),
            write_follow_dumps: true,
            database_path: out("reply_mesh.db"),
        },
    }
}

fn status(id: &str, author: &str, in_reply_to: Value) -> Value {
    json!({
        "id_str": id,
        "in_reply_to_status_id_str": in_reply_to,
        "user": {"id_str": format!("id-{}", author), "screen_name": author}
    })
}

fn users(handles: &[&str]) -> Value {
    Value::Array(
        handles
            .iter()
            .map(|h| json!({"id_str": format!("id-{}", h), "screen_name": h}))
            .collect(),
    )
}

async fn mount_root_post(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/1.1/statuses/show.json"))
        .and(query_param("id", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status("42", "alice", Value::Null)))
        .mount(server)
        .await;
}

async fn mount_replies(server: &MockServer, statuses: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/1.1/search/tweets.json"))
        .and(query_param("q", "to:alice filter:replies"))
        .and(query_param("since_id", "42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"statuses": statuses, "search_metadata": {}})),
        )
        .mount(server)
        .await;
}

/// Registers an account whose follow list is one page
async fn mount_account(server: &MockServer, handle: &str, follows: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/1.1/users/show.json"))
        .and(query_param("screen_name", handle))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id_str": format!("id-{}", handle),
            "screen_name": handle
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/1.1/friends/list.json"))
        .and(query_param("screen_name", handle))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": users(follows),
            "next_cursor": 0,
            "next_cursor_str": "0"
        })))
        .mount(server)
        .await;
}

fn csv_rows(path: &Path) -> HashSet<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn rows(rows: &[&str]) -> HashSet<String> {
    rows.iter().map(|r| r.to_string()).collect()
}

#[tokio::test]
async fn test_mutual_follows_end_to_end() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_root_post(&server).await;
    mount_replies(
        &server,
        vec![
            status("100", "bob", json!("42")),
            status("101", "carol", json!("99")),
            status("102", "dave", json!("None")),
        ],
    )
    .await;
    mount_account(&server, "alice", &["bob", "zed"]).await;
    mount_account(&server, "bob", &["alice", "carol"]).await;

    let config = create_test_config(&server.uri(), &dir, 1);
    let report = run_crawl(config.clone(), "test_hash".to_string())
        .await
        .unwrap();

    assert_eq!(report.participants, vec!["alice", "bob"]);
    assert_eq!(
        csv_rows(Path::new(&config.output.edges_path)),
        rows(&["alice,bob", "bob,alice"])
    );

    // One cooldown after each follow page
    assert_eq!(report.follow_pages, 2);
    assert_eq!(report.cooldowns, 2);

    let dump = std::fs::read_to_string(dir.path().join("follows").join("bob.txt")).unwrap();
    assert_eq!(dump, "alice\ncarol\n");

    let storage = open_storage(Path::new(&config.output.database_path)).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(Some(run.id), report.run_id);
    assert!(report.archive_error.is_none());
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test_hash");
    assert_eq!(storage.count_edges(run.id).unwrap(), 2);
}

#[tokio::test]
async fn test_unresolvable_account_is_logged_and_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_root_post(&server).await;
    mount_replies(
        &server,
        vec![
            status("100", "eve", json!("42")),
            status("101", "bob", json!("42")),
        ],
    )
    .await;
    mount_account(&server, "alice", &["eve", "bob"]).await;
    mount_account(&server, "bob", &["alice"]).await;

    Mock::given(method("GET"))
        .and(path("/1.1/users/show.json"))
        .and(query_param("screen_name", "eve"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"errors": [{"code": 50, "message": "User not found."}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), &dir, 1);
    let report = run_crawl(config.clone(), "test_hash".to_string())
        .await
        .unwrap();

    assert_eq!(report.failed, vec!["eve"]);
    assert_eq!(
        csv_rows(Path::new(&config.output.edges_path)),
        rows(&["alice,eve", "alice,bob", "bob,alice"])
    );

    let log = std::fs::read_to_string(&config.output.error_log_path).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains("-eve-"));
    assert!(log.contains("User not found."));
}

#[tokio::test]
async fn test_missing_root_post_is_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/show.json"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"errors": [{"code": 144, "message": "No status found."}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1.1/search/tweets.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), &dir, 1);
    let result = run_crawl(config.clone(), "test_hash".to_string()).await;

    assert!(matches!(result, Err(MeshError::RootPost { .. })));
    assert!(!Path::new(&config.output.edges_path).exists());

    let storage = open_storage(Path::new(&config.output.database_path)).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_throttled_follow_page_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_root_post(&server).await;
    mount_replies(&server, vec![status("100", "bob", json!("42"))]).await;

    // First follow-list request for alice is throttled once
    Mock::given(method("GET"))
        .and(path("/1.1/friends/list.json"))
        .and(query_param("screen_name", "alice"))
        .respond_with(ResponseTemplate::new(429).insert_header("x-rate-limit-reset", "1700000000"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_account(&server, "alice", &["bob"]).await;
    mount_account(&server, "bob", &[]).await;

    let config = create_test_config(&server.uri(), &dir, 1);
    let report = run_crawl(config, "test_hash".to_string()).await.unwrap();

    assert_eq!(report.throttles, 1);
    assert_eq!(report.edges, vec![Edge::new("alice", "bob")]);
    assert!(report.incomplete.is_empty());
}

#[tokio::test]
async fn test_follow_list_pages_until_cursor_zero() {
    let server = MockServer::start().await;
    let client = TwitterClient::new(&ApiConfig {
        base_url: server.uri(),
        bearer_token_env: "REPLY_MESH_TEST_TOKEN_UNSET".to_string(),
        request_timeout_secs: 5,
    })
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/1.1/friends/list.json"))
        .and(query_param("cursor", "-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": users(&["bob"]),
            "next_cursor": 1234,
            "next_cursor_str": "1234"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1.1/friends/list.json"))
        .and(query_param("cursor", "1234"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": users(&["carol"]),
            "next_cursor": 0,
            "next_cursor_str": "0"
        })))
        .mount(&server)
        .await;

    let alice = Account {
        id: "id-alice".to_string(),
        handle: "alice".to_string(),
    };

    let PageOutcome::Page(first) = client.follows_page(&alice, 200, None).await else {
        panic!("expected a page");
    };
    assert_eq!(first.items[0].handle, "bob");
    assert_eq!(first.next.as_deref(), Some("1234"));

    let PageOutcome::Page(second) = client.follows_page(&alice, 200, Some("1234")).await else {
        panic!("expected a page");
    };
    assert_eq!(second.items[0].handle, "carol");
    assert_eq!(second.next, None);
}

#[tokio::test]
async fn test_reply_search_walks_backwards_by_id() {
    let server = MockServer::start().await;
    let client = TwitterClient::new(&ApiConfig {
        base_url: server.uri(),
        bearer_token_env: "REPLY_MESH_TEST_TOKEN_UNSET".to_string(),
        request_timeout_secs: 5,
    })
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/1.1/search/tweets.json"))
        .and(query_param("count", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statuses": [
                status("105", "bob", json!("42")),
                status("103", "carol", json!("42"))
            ],
            "search_metadata": {"next_results": "?max_id=102"}
        })))
        .mount(&server)
        .await;

    let query = ReplyQuery {
        author: "alice".to_string(),
        since_id: "42".to_string(),
        page_size: 2,
    };

    let PageOutcome::Page(page) = client.search_replies(&query, None).await else {
        panic!("expected a page");
    };
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.next.as_deref(), Some("102"));
}

#[tokio::test]
async fn test_error_statuses_are_classified() {
    let server = MockServer::start().await;
    let client = TwitterClient::new(&ApiConfig {
        base_url: server.uri(),
        bearer_token_env: "REPLY_MESH_TEST_TOKEN_UNSET".to_string(),
        request_timeout_secs: 5,
    })
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/1.1/users/show.json"))
        .and(query_param("screen_name", "locked"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"errors": [{"code": 63, "message": "User has been suspended."}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1.1/users/show.json"))
        .and(query_param("screen_name", "busy"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1.1/friends/list.json"))
        .respond_with(ResponseTemplate::new(503).set_body_string("over capacity"))
        .mount(&server)
        .await;

    assert!(matches!(
        client.resolve_account("locked").await,
        Err(ProviderError::Forbidden(message)) if message == "User has been suspended."
    ));
    assert!(matches!(
        client.resolve_account("busy").await,
        Err(ProviderError::Throttled)
    ));

    let account = Account {
        id: "1".to_string(),
        handle: "bob".to_string(),
    };
    match client.follows_page(&account, 200, None).await {
        PageOutcome::Failed(detail) => assert!(detail.contains("503")),
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bearer_token_sent_from_environment() {
    let server = MockServer::start().await;
    std::env::set_var("REPLY_MESH_TEST_TOKEN_HEADER", "s3cret");
    let client = TwitterClient::new(&ApiConfig {
        base_url: server.uri(),
        bearer_token_env: "REPLY_MESH_TEST_TOKEN_HEADER".to_string(),
        request_timeout_secs: 5,
    })
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/show.json"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status("42", "alice", Value::Null)))
        .expect(1)
        .mount(&server)
        .await;

    let post = client.lookup_post("42").await.unwrap();
    assert_eq!(post.author, "alice");
}

#[tokio::test]
async fn test_worker_pool_end_to_end() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_root_post(&server).await;
    mount_replies(
        &server,
        vec![
            status("100", "bob", json!("42")),
            status("101", "carol", json!("42")),
            status("102", "dave", json!("42")),
        ],
    )
    .await;
    mount_account(&server, "alice", &["carol"]).await;
    mount_account(&server, "bob", &["alice", "dave"]).await;
    mount_account(&server, "carol", &["bob"]).await;
    mount_account(&server, "dave", &["nobody"]).await;

    let config = create_test_config(&server.uri(), &dir, 2);
    let report = run_crawl(config.clone(), "test_hash".to_string())
        .await
        .unwrap();

    let edges: HashSet<Edge> = report.edges.iter().cloned().collect();
    assert_eq!(
        edges,
        HashSet::from([
            Edge::new("alice", "carol"),
            Edge::new("bob", "alice"),
            Edge::new("bob", "dave"),
            Edge::new("carol", "bob"),
        ])
    );
    assert_eq!(
        csv_rows(Path::new(&config.output.edges_path)),
        rows(&["alice,carol", "bob,alice", "bob,dave", "carol,bob"])
    );
    // Four paced follow pages on one credential take four cooldowns
    assert_eq!(report.follow_pages, 4);
    assert!(report.elapsed >= Duration::from_millis(40));
}
