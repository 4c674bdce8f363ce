//! Photo notification broadcast bus
//!
//! A single control-loop task owns the subscriber set. Registration,
//! unregistration, and publishing all arrive on one command channel, so
//! the set is never touched concurrently and every subscriber observes
//! publishes in the same relative order.

use catalog::{CatalogError, PhotoCatalog, PhotoEntry};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

/// How many catalog entries a fresh subscriber receives on registration.
pub const BACKLOG_SIZE: usize = 10;

/// Capacity of each subscriber's outbound queue. A subscriber that
/// falls this far behind is dropped rather than allowed to hold back
/// the bus.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 2048;

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one registered subscriber for the lifetime of the process.
pub type SubscriberId = u64;

/// The bus-facing half of one live consumer: its id and the sending end
/// of its bounded outbound queue. The receiving end belongs to the
/// subscriber's session.
pub struct Subscriber {
    id: SubscriberId,
    queue: mpsc::Sender<String>,
}

impl Subscriber {
    /// Allocate a subscriber and the receiving half of its queue.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (queue, rx) = mpsc::channel(capacity);
        let id = NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed);
        (Self { id, queue }, rx)
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

enum Command {
    Register(Subscriber),
    Unregister(SubscriberId),
    Publish(Arc<PhotoEntry>),
}

/// Cloneable handle to the bus control loop. All three operations are
/// fire-and-forget: they enqueue a command and never block the caller.
#[derive(Clone)]
pub struct NotificationBus {
    commands: mpsc::UnboundedSender<Command>,
}

impl NotificationBus {
    /// Spawn the control loop. It runs until every handle is dropped.
    pub fn spawn(catalog: Arc<PhotoCatalog>) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(control_loop(catalog, rx));
        Self { commands }
    }

    /// Register a subscriber. Its queue is seeded with the current
    /// backlog before any later publish can reach it.
    pub fn register(&self, subscriber: Subscriber) {
        let _ = self.commands.send(Command::Register(subscriber));
    }

    /// Remove a subscriber and close its outbound queue. No-op for an
    /// id that is not registered.
    pub fn unregister(&self, id: SubscriberId) {
        let _ = self.commands.send(Command::Unregister(id));
    }

    /// Broadcast a newly discovered photo to all current subscribers.
    pub fn publish(&self, entry: Arc<PhotoEntry>) {
        let _ = self.commands.send(Command::Publish(entry));
    }
}

async fn control_loop(catalog: Arc<PhotoCatalog>, mut commands: mpsc::UnboundedReceiver<Command>) {
    let mut subscribers: HashMap<SubscriberId, mpsc::Sender<String>> = HashMap::new();

    while let Some(command) = commands.recv().await {
        match command {
            Command::Register(subscriber) => register(&catalog, &mut subscribers, subscriber),
            Command::Unregister(id) => unregister(&mut subscribers, id),
            Command::Publish(entry) => publish(&mut subscribers, &entry),
        }
    }

    debug!("Notification bus stopped: all handles dropped");
}

fn register(
    catalog: &PhotoCatalog,
    subscribers: &mut HashMap<SubscriberId, mpsc::Sender<String>>,
    subscriber: Subscriber,
) {
    if subscribers.contains_key(&subscriber.id) {
        return; // already registered
    }

    // Seed the fresh queue with the backlog before the subscriber joins
    // the set. Both happen on this loop, so no publish can land between
    // them: the first live entry always follows the last backlog entry,
    // with no duplicate and no gap.
    let backlog = match catalog.recent(BACKLOG_SIZE) {
        Ok(backlog) => backlog,
        Err(CatalogError::Empty) => Vec::new(),
    };
    for entry in backlog {
        let payload = match entry.wire_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Skipping unserializable entry {}: {}", entry, e);
                continue;
            }
        };
        if subscriber.queue.try_send(payload).is_err() {
            // Can't even hold the backlog: treat the subscriber as dead.
            warn!(
                "Dropping subscriber {}: backlog overflowed its queue",
                subscriber.id
            );
            return;
        }
    }

    info!("Registered subscriber {}", subscriber.id);
    subscribers.insert(subscriber.id, subscriber.queue);
}

fn unregister(subscribers: &mut HashMap<SubscriberId, mpsc::Sender<String>>, id: SubscriberId) {
    if subscribers.remove(&id).is_some() {
        // Dropping the sender closes the queue; the session's outbound
        // pump sees the close once it has drained what was delivered.
        info!("Unregistered subscriber {}", id);
    }
}

fn publish(subscribers: &mut HashMap<SubscriberId, mpsc::Sender<String>>, entry: &PhotoEntry) {
    let payload = match entry.wire_payload() {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Not broadcasting unserializable entry {}: {}", entry, e);
            return;
        }
    };

    info!(
        "Broadcast photo {} to {} subscribers",
        entry,
        subscribers.len()
    );

    let mut dead = Vec::new();
    for (id, queue) in subscribers.iter() {
        match queue.try_send(payload.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Subscriber {} is too slow, dropping it", id);
                dead.push(*id);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Subscriber {} queue already closed", id);
                dead.push(*id);
            }
        }
    }
    for id in dead {
        unregister(subscribers, id);
    }
}
