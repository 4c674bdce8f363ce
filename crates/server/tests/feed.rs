//! End-to-end subscriber feed tests
//!
//! Spins up the real router on an ephemeral port and drives it with a
//! WebSocket client, the way a browser would.

use catalog::{PhotoCatalog, PhotoEntry};
use futures_util::StreamExt;
use server_lib::{app, NotificationBus};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;

type WsClient = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

fn entry(name: &str, ts_secs: u64) -> Arc<PhotoEntry> {
    Arc::new(PhotoEntry::new(
        PathBuf::from(format!("/photos/{name}")),
        UNIX_EPOCH + Duration::from_secs(ts_secs),
    ))
}

async fn spawn_server(bus: NotificationBus, dir: &TempDir) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(bus, dir.path().to_path_buf(), dir.path().to_path_buf());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}/data")).await.unwrap();
    ws
}

/// Next photo notification from the feed, skipping protocol frames.
async fn next_photo_path(ws: &mut WsClient) -> String {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("expected a feed message")
            .expect("feed closed unexpectedly")
            .unwrap();
        if let Message::Text(text) = message {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            return value["path"].as_str().unwrap().to_string();
        }
    }
}

/// Assert the feed stays quiet for a little while.
async fn assert_no_photo(ws: &mut WsClient) {
    let quiet = tokio::time::timeout(Duration::from_millis(300), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break text,
                Some(Ok(_)) => continue,
                _ => futures_util::future::pending().await,
            }
        }
    })
    .await;
    assert!(quiet.is_err(), "unexpected feed message: {:?}", quiet);
}

#[tokio::test]
async fn subscriber_gets_backlog_then_live_updates() {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(PhotoCatalog::new());
    for (name, ts) in [("a.jpg", 1), ("b.jpg", 2), ("c.jpg", 3)] {
        assert!(catalog.ingest(entry(name, ts)));
    }
    let bus = NotificationBus::spawn(catalog.clone());
    let addr = spawn_server(bus.clone(), &dir).await;

    let mut ws = connect(addr).await;
    for expected in ["a.jpg", "b.jpg", "c.jpg"] {
        assert_eq!(next_photo_path(&mut ws).await, format!("/photos/{expected}"));
    }

    // A photo arrives while the subscriber is connected.
    let d = entry("d.jpg", 4);
    assert!(catalog.ingest(d.clone()));
    bus.publish(d);
    assert_eq!(next_photo_path(&mut ws).await, "/photos/d.jpg");

    // A late subscriber sees d in the backlog, exactly once.
    let mut late = connect(addr).await;
    for expected in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
        assert_eq!(
            next_photo_path(&mut late).await,
            format!("/photos/{expected}")
        );
    }
    assert_no_photo(&mut late).await;
}

#[tokio::test]
async fn disconnected_subscriber_does_not_affect_others() {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(PhotoCatalog::new());
    assert!(catalog.ingest(entry("seed.jpg", 0)));
    let bus = NotificationBus::spawn(catalog.clone());
    let addr = spawn_server(bus.clone(), &dir).await;

    let mut first = connect(addr).await;
    let mut second = connect(addr).await;

    // Draining the backlog proves both registrations went through
    // before anything new is published.
    assert_eq!(next_photo_path(&mut first).await, "/photos/seed.jpg");
    assert_eq!(next_photo_path(&mut second).await, "/photos/seed.jpg");

    let e1 = entry("e1.jpg", 1);
    assert!(catalog.ingest(e1.clone()));
    bus.publish(e1);
    assert_eq!(next_photo_path(&mut first).await, "/photos/e1.jpg");
    assert_eq!(next_photo_path(&mut second).await, "/photos/e1.jpg");

    // First subscriber walks away mid-stream.
    drop(first);

    let e2 = entry("e2.jpg", 2);
    assert!(catalog.ingest(e2.clone()));
    bus.publish(e2);
    assert_eq!(next_photo_path(&mut second).await, "/photos/e2.jpg");
}

#[tokio::test]
async fn backlog_is_limited_to_ten_entries() {
    let dir = TempDir::new().unwrap();
    let catalog = Arc::new(PhotoCatalog::new());
    for i in 0..15 {
        assert!(catalog.ingest(entry(&format!("{i:02}.jpg"), i)));
    }
    let bus = NotificationBus::spawn(catalog.clone());
    let addr = spawn_server(bus, &dir).await;

    let mut ws = connect(addr).await;
    // Entries 05..14: the ten most recent, oldest first.
    for i in 5..15 {
        assert_eq!(next_photo_path(&mut ws).await, format!("/photos/{i:02}.jpg"));
    }
    assert_no_photo(&mut ws).await;
}
