use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::debug;

use crate::events::EventRecord;

/// A complete, immutable collection as held by the store.
pub type EventCollection = Arc<Vec<EventRecord>>;

#[derive(Debug, Default)]
struct HeldCollection {
    events: EventCollection,
    /// Ticket of the refresh that produced `events`; 0 before the first one.
    ticket: u64,
}

/// Holds the current event collection. A refresh always replaces the whole
/// collection; readers get an `Arc` to a complete collection and are never
/// exposed to a partially written one.
///
/// Refreshes take a ticket when issued. A result is adopted only if its
/// ticket is newer than the held one, so a slow, superseded fetch cannot
/// overwrite a newer collection.
#[derive(Debug, Default)]
pub struct EventStore {
    held: RwLock<HeldCollection>,
    last_issued: AtomicU64,
}

impl EventStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reserves a ticket for a refresh that is about to be issued.
    pub fn issue_ticket(&self) -> u64 {
        self.last_issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Swaps in `events` unconditionally.
    pub async fn replace_all(&self, events: Vec<EventRecord>) {
        let ticket = self.issue_ticket();
        self.replace_if_newer(ticket, events).await;
    }

    /// Swaps in `events` if `ticket` is newer than the held collection's.
    /// Returns whether the collection was adopted.
    pub async fn replace_if_newer(&self, ticket: u64, events: Vec<EventRecord>) -> bool {
        let mut held = self.held.write().await;
        if ticket <= held.ticket {
            debug!(
                ticket,
                held_ticket = held.ticket,
                "Discarding superseded event collection."
            );
            return false;
        }
        held.events = Arc::new(events);
        held.ticket = ticket;
        true
    }

    pub async fn current(&self) -> EventCollection {
        self.held.read().await.events.clone()
    }

    /// Ticket of the collection currently held.
    pub async fn held_ticket(&self) -> u64 {
        self.held.read().await.ticket
    }
}
