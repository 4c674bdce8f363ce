//! Per-connection subscriber session
//!
//! Two pumps share one WebSocket: the inbound pump reads only to notice
//! the peer going away, the outbound pump drains the queue and probes
//! with keepalive pings. Whichever pump stops first wins the race and
//! teardown runs once.

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::bus::{NotificationBus, SubscriberId};

/// Keepalive ping period. The peer is expected to answer within a 60
/// second window, so probe at nine tenths of it.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(54);

/// Run one subscriber session to completion.
///
/// Teardown is a single code path reached from either pump: unregister
/// from the bus (a no-op if the bus already dropped us) and let the
/// socket halves close on drop.
pub async fn run(
    socket: WebSocket,
    id: SubscriberId,
    queue: mpsc::Receiver<String>,
    bus: NotificationBus,
) {
    info!("Subscriber {} connected", id);
    let (sink, stream) = socket.split();

    let mut outbound = tokio::spawn(outbound_pump(sink, queue));
    tokio::select! {
        _ = &mut outbound => {}
        _ = inbound_pump(stream) => {}
    }

    bus.unregister(id);
    outbound.abort();
    info!("Subscriber {} disconnected", id);
}

/// Read until the peer closes or the transport errors. Inbound payloads
/// are not consumed; this pump exists for liveness detection only.
async fn inbound_pump(mut stream: SplitStream<WebSocket>) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // pongs and any application chatter prove liveness
            Err(e) => {
                debug!("Subscriber read failed: {}", e);
                break;
            }
        }
    }
}

/// Forward queued messages to the transport, pinging between them.
async fn outbound_pump(mut sink: SplitSink<WebSocket, Message>, mut queue: mpsc::Receiver<String>) {
    let mut keepalive = time::interval_at(
        Instant::now() + KEEPALIVE_INTERVAL,
        KEEPALIVE_INTERVAL,
    );
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = keepalive.tick() => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    debug!("Subscriber keepalive failed");
                    break;
                }
            }
            message = queue.recv() => match message {
                Some(payload) => {
                    if sink.send(Message::Text(payload.into())).await.is_err() {
                        debug!("Subscriber write failed");
                        break;
                    }
                }
                None => {
                    // The bus closed the queue; say goodbye to the peer.
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }
}
