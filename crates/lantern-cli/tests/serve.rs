//! Integration tests for `lantern serve`: spawn the real binary on an
//! ephemeral port and drive the HTTP surface with reqwest.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tempfile::TempDir;

fn lantern_binary() -> std::path::PathBuf {
    assert_cmd::cargo::cargo_bin!("lantern").into()
}

struct ServerHandle {
    child: Child,
    base_url: String,
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Spawn `lantern serve` on port 0 and parse the bound address from the
/// first stdout line.
fn spawn_serve(data_dir: &TempDir, extra_args: &[&str]) -> ServerHandle {
    let mut child = Command::new(lantern_binary())
        .args(["serve", "--listen", "127.0.0.1:0"])
        .args(extra_args)
        .env("LANTERN_DATA_DIR", data_dir.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn lantern serve");

    let stdout = child.stdout.take().expect("stdout pipe");
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bound address");

    let addr = line
        .trim()
        .strip_prefix("listening on ")
        .unwrap_or_else(|| panic!("unexpected startup line: {line:?}"))
        .to_string();

    ServerHandle {
        child,
        base_url: addr,
    }
}

fn seed(data_dir: &TempDir, count: u32) {
    let status = Command::new(lantern_binary())
        .args(["seed", "--count", &count.to_string()])
        .env("LANTERN_DATA_DIR", data_dir.path())
        .status()
        .expect("failed to run lantern seed");
    assert!(status.success());
}

#[tokio::test]
async fn healthz_and_stats() {
    let dir = TempDir::new().unwrap();
    seed(&dir, 10);
    let server = spawn_serve(&dir, &[]);

    let health = reqwest::get(format!("{}/healthz", server.base_url))
        .await
        .unwrap();
    assert!(health.status().is_success());
    assert_eq!(health.text().await.unwrap(), "ok");

    let stats: serde_json::Value = reqwest::get(format!("{}/stats", server.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["lifecycle"], "running");
    assert_eq!(stats["working_set_len"], 10);
    assert_eq!(stats["total_shown"], 1);
}

#[tokio::test]
async fn cluster_endpoint_reflects_traversal() {
    let dir = TempDir::new().unwrap();
    seed(&dir, 24);
    let server = spawn_serve(&dir, &[]);

    let cluster: serde_json::Value = reqwest::get(format!("{}/cluster", server.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let focus_id = cluster["focus"]["id"].as_i64().expect("focus id");
    assert!(focus_id >= 1);
    let related = cluster["related"].as_array().expect("related array");
    assert!(related.len() <= 19);
    for entry in related {
        assert_ne!(entry["message"]["id"], cluster["focus"]["id"]);
        assert!(entry["similarity"].as_f64().is_some());
    }
    assert!(cluster["next"]["id"].as_i64().is_some());
}

#[tokio::test]
async fn cluster_is_null_on_empty_store() {
    let dir = TempDir::new().unwrap();
    let server = spawn_serve(&dir, &[]);

    let body = reqwest::get(format!("{}/cluster", server.base_url))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "null");
}

#[tokio::test]
async fn submit_roundtrip_and_validation() {
    let dir = TempDir::new().unwrap();
    seed(&dir, 5);
    let server = spawn_serve(&dir, &[]);
    let client = reqwest::Client::new();

    // Valid submission: 201 with the stored message.
    let created = client
        .post(format!("{}/submit", server.base_url))
        .json(&serde_json::json!({ "content": "You are missed at every table." }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), reqwest::StatusCode::CREATED);
    let message: serde_json::Value = created.json().await.unwrap();
    assert_eq!(message["id"], 6);
    assert_eq!(message["content"], "You are missed at every table.");

    // Blank content: 422 with a reason.
    let rejected = client
        .post(format!("{}/submit", server.base_url))
        .json(&serde_json::json!({ "content": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = rejected.json().await.unwrap();
    assert!(body["error"].as_str().is_some());

    // Oversized content: also 422.
    let long = "x".repeat(281);
    let rejected = client
        .post(format!("{}/submit", server.base_url))
        .json(&serde_json::json!({ "content": long }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn events_stream_delivers_cluster_changes() {
    use eventsource_stream::Eventsource;
    use futures_util::StreamExt;

    let dir = TempDir::new().unwrap();
    seed(&dir, 12);
    // Fast cycles so the stream produces events within the test window.
    let server = spawn_serve(&dir, &["--cluster-duration-ms", "300"]);

    let response = reqwest::get(format!("{}/events", server.base_url))
        .await
        .unwrap();
    assert!(response.status().is_success());
    let mut stream = response.bytes_stream().eventsource();

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut saw_cluster = false;
    let mut saw_working_set = false;
    while Instant::now() < deadline && !(saw_cluster && saw_working_set) {
        let event = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("event stream stalled")
            .expect("event stream ended")
            .expect("event stream error");
        match event.event.as_str() {
            "cluster_changed" => {
                let data: serde_json::Value = serde_json::from_str(&event.data).unwrap();
                assert_eq!(data["type"], "cluster_changed");
                assert!(data["cluster"]["focus"]["id"].as_i64().is_some());
                saw_cluster = true;
            }
            "working_set_changed" => {
                let data: serde_json::Value = serde_json::from_str(&event.data).unwrap();
                assert_eq!(data["type"], "working_set_changed");
                saw_working_set = true;
            }
            other => panic!("unexpected event name: {other}"),
        }
    }
    assert!(saw_cluster, "no cluster_changed event within deadline");
    assert!(saw_working_set, "no working_set_changed event within deadline");
}

#[cfg(unix)]
#[tokio::test]
async fn serve_exits_cleanly_on_sigterm() {
    let dir = TempDir::new().unwrap();
    seed(&dir, 5);
    let mut server = spawn_serve(&dir, &[]);

    let status = Command::new("kill")
        .args(["-TERM", &server.child.id().to_string()])
        .status()
        .expect("failed to send SIGTERM");
    assert!(status.success());

    let start = Instant::now();
    let deadline = Duration::from_secs(5);
    loop {
        match server.child.try_wait().expect("try_wait") {
            Some(status) => {
                assert!(status.success(), "expected exit 0, got {status}");
                break;
            }
            None if start.elapsed() > deadline => panic!("server did not exit after SIGTERM"),
            None => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    }
}
