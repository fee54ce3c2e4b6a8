//! End-to-end tests for the tail engine: attach/detach lifecycles,
//! delivery ordering, fan-out, and watcher release.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use tokio::sync::mpsc;

use taillight_core::{handle_inbound, ClientHandle, Outbound, Registry};

fn client() -> (ClientHandle, mpsc::Receiver<Outbound>) {
    let (tx, rx) = mpsc::channel(256);
    (ClientHandle::new(tx), rx)
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn append(path: &Path, data: &str) {
    let mut f = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .unwrap();
    write!(f, "{data}").unwrap();
    f.flush().unwrap();
}

async fn recv(rx: &mut mpsc::Receiver<Outbound>) -> Outbound {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn attach_delivers_backfill_then_status() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "app.log", "one\ntwo\nthree\n");
    let registry = Registry::new();
    let (c, mut rx) = client();

    registry.attach(&c, path.clone()).await;

    for expected in ["one", "two", "three"] {
        match recv(&mut rx).await {
            Outbound::Line { data, file_path } => {
                assert_eq!(data, expected);
                assert_eq!(file_path, path.display().to_string());
            }
            other => panic!("expected line, got {other:?}"),
        }
    }
    match recv(&mut rx).await {
        Outbound::Status { message } => assert!(message.contains("Now watching")),
        other => panic!("expected status, got {other:?}"),
    }
    assert!(registry.is_watching(&path).await);
    assert_eq!(registry.subscriber_count(&path).await, 1);
}

#[tokio::test]
async fn backfill_is_capped_at_configured_size() {
    let dir = tempdir().unwrap();
    let contents: String = (1..=50).map(|i| format!("Line {i}: entry {i}\n")).collect();
    let path = write_file(dir.path(), "app.log", &contents);
    let registry = Registry::new();
    let (c, mut rx) = client();

    registry.attach(&c, path.clone()).await;

    let mut lines = Vec::new();
    loop {
        match recv(&mut rx).await {
            Outbound::Line { data, .. } => lines.push(data),
            Outbound::Status { .. } => break,
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0], "Line 41: entry 41");
    assert_eq!(lines[9], "Line 50: entry 50");
}

#[tokio::test]
async fn attach_to_missing_file_sends_error_only() {
    let registry = Registry::new();
    let (c, mut rx) = client();
    let path = PathBuf::from("/nonexistent/taillight-test.log");

    registry.attach(&c, path.clone()).await;

    match recv(&mut rx).await {
        Outbound::Error { message } => assert!(message.contains("File not found")),
        other => panic!("expected error, got {other:?}"),
    }
    assert!(rx.try_recv().is_err(), "no further events expected");
    assert_eq!(registry.stream_count().await, 0);
}

#[tokio::test]
async fn live_appends_delivered_exactly_once_in_order() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "app.log", "");
    let registry = Registry::new();
    let (c, mut rx) = client();

    registry.attach(&c, path.clone()).await;
    match recv(&mut rx).await {
        Outbound::Status { .. } => {}
        other => panic!("expected status first on empty file, got {other:?}"),
    }

    let appender = tokio::spawn({
        let path = path.clone();
        async move {
            for i in 1..=20 {
                append(&path, &format!("entry {i}\n"));
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    });

    let mut got: Vec<String> = Vec::new();
    let collected = tokio::time::timeout(Duration::from_secs(15), async {
        while got.len() < 20 {
            if let Outbound::Line { data, .. } = recv(&mut rx).await {
                got.push(data);
            }
        }
    })
    .await;
    appender.abort();
    assert!(collected.is_ok(), "expected 20 live lines, got {}", got.len());

    let expected: Vec<String> = (1..=20).map(|i| format!("entry {i}")).collect();
    assert_eq!(got, expected, "no gaps, duplicates, or reordering");

    // Nothing trails behind.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn late_joiner_gets_fresh_backfill() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "app.log", "a\nb\nc\n");
    let registry = Registry::new();

    let (c1, mut rx1) = client();
    registry.attach(&c1, path.clone()).await;
    for _ in 0..4 {
        recv(&mut rx1).await; // drain c1's backfill and status
    }

    let (c2, mut rx2) = client();
    registry.attach(&c2, path.clone()).await;

    let mut lines = Vec::new();
    loop {
        match recv(&mut rx2).await {
            Outbound::Line { data, .. } => lines.push(data),
            Outbound::Status { message } => {
                assert!(message.contains("Now watching"));
                break;
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(lines, vec!["a", "b", "c"]);
    assert_eq!(registry.subscriber_count(&path).await, 2);
    assert_eq!(registry.stream_count().await, 1);
}

#[tokio::test]
async fn concurrent_attaches_share_one_stream() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "app.log", "seed\n");
    let registry = Arc::new(Registry::new());

    let mut receivers = Vec::new();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let (c, rx) = client();
        receivers.push(rx);
        let registry = Arc::clone(&registry);
        let path = path.clone();
        handles.push(tokio::spawn(async move {
            registry.attach(&c, path).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // However the attaches interleave, exactly one stream exists and every
    // session is subscribed to it.
    assert_eq!(registry.stream_count().await, 1);
    assert_eq!(registry.subscriber_count(&path).await, 8);

    for rx in &mut receivers {
        match recv(rx).await {
            Outbound::Line { data, .. } => assert_eq!(data, "seed"),
            other => panic!("expected backfill line, got {other:?}"),
        }
        match recv(rx).await {
            Outbound::Status { message } => assert!(message.contains("Now watching")),
            other => panic!("expected status, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn detach_isolates_other_subscribers() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "app.log", "seed\n");
    let registry = Registry::new();

    let (c1, mut rx1) = client();
    let (c2, mut rx2) = client();
    registry.attach(&c1, path.clone()).await;
    registry.attach(&c2, path.clone()).await;
    for _ in 0..2 {
        recv(&mut rx1).await;
        recv(&mut rx2).await;
    }

    registry.detach(c1.id(), &path).await;
    assert!(
        registry.is_watching(&path).await,
        "stream must survive for the remaining subscriber"
    );
    assert_eq!(registry.subscriber_count(&path).await, 1);

    let appender = tokio::spawn({
        let path = path.clone();
        async move {
            for i in 0..10 {
                append(&path, &format!("live {i}\n"));
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
    });

    let line = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Outbound::Line { data, .. } = recv(&mut rx2).await {
                if data.starts_with("live") {
                    return data;
                }
            }
        }
    })
    .await;
    appender.abort();
    assert!(line.is_ok(), "remaining subscriber should keep receiving");

    // The detached session sees none of the live lines.
    assert!(rx1.try_recv().is_err());
}

#[tokio::test]
async fn last_disconnect_releases_watcher() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "app.log", "seed\n");
    let registry = Registry::new();
    let (c, mut rx) = client();

    registry.attach(&c, path.clone()).await;
    recv(&mut rx).await; // backfill
    recv(&mut rx).await; // status

    registry.disconnect(c.id()).await;
    assert!(!registry.is_watching(&path).await);
    assert_eq!(registry.stream_count().await, 0);

    // Appends after release produce no deliveries.
    append(&path, "after\n");
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn detach_when_not_subscribed_is_noop() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "app.log", "seed\n");
    let registry = Registry::new();

    let (c1, mut rx1) = client();
    registry.attach(&c1, path.clone()).await;
    recv(&mut rx1).await;
    recv(&mut rx1).await;

    // A session that never attached detaches: nothing changes.
    let (c2, _rx2) = client();
    registry.detach(c2.id(), &path).await;
    assert!(registry.is_watching(&path).await);
    assert_eq!(registry.subscriber_count(&path).await, 1);

    // Detaching from a path nobody watches is also fine.
    registry.detach(c2.id(), Path::new("/tmp/never-watched.log")).await;
}

#[tokio::test]
async fn disconnect_cascades_all_watched_paths() {
    let dir = tempdir().unwrap();
    let solo = write_file(dir.path(), "solo.log", "s\n");
    let shared = write_file(dir.path(), "shared.log", "sh\n");
    let registry = Registry::new();

    let (c1, mut rx1) = client();
    let (c2, mut rx2) = client();
    registry.attach(&c1, solo.clone()).await;
    registry.attach(&c1, shared.clone()).await;
    registry.attach(&c2, shared.clone()).await;
    for _ in 0..4 {
        recv(&mut rx1).await;
    }
    for _ in 0..2 {
        recv(&mut rx2).await;
    }

    registry.disconnect(c1.id()).await;

    assert!(!registry.is_watching(&solo).await, "solo stream torn down");
    assert!(registry.is_watching(&shared).await, "shared stream survives");
    assert_eq!(registry.subscriber_count(&shared).await, 1);
}

#[tokio::test]
async fn shutdown_drops_everything_and_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "app.log", "seed\n");
    let registry = Registry::new();
    let (c, mut rx) = client();

    registry.attach(&c, path.clone()).await;
    recv(&mut rx).await;
    recv(&mut rx).await;

    registry.shutdown().await;
    assert_eq!(registry.stream_count().await, 0);

    registry.shutdown().await;
    assert_eq!(registry.stream_count().await, 0);
}

#[tokio::test]
async fn inbound_watch_and_unwatch_drive_subscriptions() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "app.log", "hello\n");
    let registry = Registry::new();
    let (c, mut rx) = client();

    let watch = format!(r#"{{"type":"watch","filePath":"{}"}}"#, path.display());
    handle_inbound(&registry, &c, &watch).await;

    match recv(&mut rx).await {
        Outbound::Line { data, .. } => assert_eq!(data, "hello"),
        other => panic!("expected line, got {other:?}"),
    }
    match recv(&mut rx).await {
        Outbound::Status { .. } => {}
        other => panic!("expected status, got {other:?}"),
    }
    assert!(registry.is_watching(&path).await);

    let unwatch = format!(r#"{{"type":"unwatch","filePath":"{}"}}"#, path.display());
    handle_inbound(&registry, &c, &unwatch).await;
    assert!(!registry.is_watching(&path).await);
}

#[tokio::test]
async fn inbound_garbage_is_dropped_without_state_change() {
    let registry = Registry::new();
    let (c, mut rx) = client();

    handle_inbound(&registry, &c, "not json at all").await;
    handle_inbound(&registry, &c, r#"{"type":"reboot","filePath":"/x"}"#).await;
    handle_inbound(&registry, &c, r#"{"type":"watch"}"#).await;

    assert_eq!(registry.stream_count().await, 0);
    assert!(rx.try_recv().is_err(), "no events for dropped messages");
}
