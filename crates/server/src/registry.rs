//! Subscriber-facing gateway
//!
//! Builds the HTTP surface and turns each `/data` upgrade into a
//! registered subscriber session.

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::bus::{NotificationBus, Subscriber, OUTBOUND_QUEUE_CAPACITY};
use crate::session;

/// Build the photobeam router: the subscriber feed at `/data`, photo
/// bytes under `/photo`, and the browser UI at the root.
pub fn app(bus: NotificationBus, photo_folder: PathBuf, web_dist: PathBuf) -> Router {
    Router::new()
        .route("/data", get(feed_handler))
        .nest_service("/photo", ServeDir::new(photo_folder))
        .fallback_service(ServeDir::new(web_dist))
        .layer(TraceLayer::new_for_http())
        .with_state(bus)
}

async fn feed_handler(ws: WebSocketUpgrade, State(bus): State<NotificationBus>) -> Response {
    ws.on_upgrade(move |socket| handle_subscriber(socket, bus))
}

/// Register a fresh subscriber and run its session until it ends.
///
/// Registration seeds the outbound queue with the current backlog on
/// the bus control loop, so backlog delivery cannot race a concurrent
/// publish. Session teardown issues the matching unregister; there is
/// no way for a dead session to stay registered.
async fn handle_subscriber(socket: WebSocket, bus: NotificationBus) {
    let (subscriber, queue) = Subscriber::new(OUTBOUND_QUEUE_CAPACITY);
    let id = subscriber.id();
    bus.register(subscriber);
    session::run(socket, id, queue, bus).await;
}
