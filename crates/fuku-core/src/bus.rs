//! In-process publish/subscribe event bus.
//!
//! Per-publisher FIFO delivery to every subscriber is guaranteed; a single
//! total order across publishers is not. Each subscriber has its own
//! bounded mailbox (default capacity 256); on overflow the bus drops the
//! *oldest* undelivered message for that subscriber and bumps a counter —
//! publishers never block on a slow subscriber.
//!
//! Built on a `Mutex<VecDeque>` + `Notify` per subscriber rather than
//! `tokio::sync::broadcast`, because `broadcast` reports a lagged receiver
//! as an error instead of silently dropping the oldest message, which is
//! the opposite of the drop-oldest semantics wanted here.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::event::Event;

/// Default per-subscriber mailbox capacity.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 256;

struct Mailbox {
    id: u64,
    queue: Mutex<VecDeque<Event>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
}

impl Mailbox {
    fn push(&self, event: Event) {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(event);
        drop(queue);
        self.notify.notify_one();
    }

    fn try_pop(&self) -> Option<Event> {
        self.queue.lock().pop_front()
    }
}

/// Cloneable handle to the bus. Publishers and the subscription registry
/// share the same inner state.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Arc<Mailbox>>>>,
    next_id: Arc<AtomicU64>,
    closed: Arc<CancellationToken>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `event` on every live subscriber's mailbox. Never blocks.
    pub fn publish(&self, event: Event) {
        let subs = self.subscribers.lock();
        for mailbox in subs.iter() {
            mailbox.push(event.clone());
        }
    }

    /// Subscribe with the default mailbox capacity. The returned stream
    /// terminates when `scope` is cancelled or the bus is closed.
    pub fn subscribe(&self, scope: CancellationToken) -> Subscription {
        self.subscribe_with_capacity(scope, DEFAULT_SUBSCRIBER_CAPACITY)
    }

    pub fn subscribe_with_capacity(&self, scope: CancellationToken, capacity: usize) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mailbox = Arc::new(Mailbox {
            id,
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        });
        self.subscribers.lock().push(mailbox.clone());
        Subscription { bus: self.clone(), mailbox, scope }
    }

    /// Closes the bus: every live subscription's stream ends after
    /// draining whatever is already queued.
    pub fn close(&self) {
        self.closed.cancel();
    }

    fn unregister(&self, id: u64) {
        self.subscribers.lock().retain(|m| m.id != id);
    }

    /// Number of currently registered subscribers (for tests/diagnostics).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// A live subscription. Dropping it unregisters the mailbox from the bus.
pub struct Subscription {
    bus: EventBus,
    mailbox: Arc<Mailbox>,
    scope: CancellationToken,
}

impl Subscription {
    /// Waits for the next event, or `None` once the scope/bus is cancelled
    /// and the mailbox has drained.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            if let Some(event) = self.mailbox.try_pop() {
                return Some(event);
            }
            if self.scope.is_cancelled() || self.bus.closed.is_cancelled() {
                return None;
            }
            tokio::select! {
                _ = self.mailbox.notify.notified() => {}
                _ = self.scope.cancelled() => {}
                _ = self.bus.closed.cancelled() => {}
            }
        }
    }

    /// Count of events dropped for this subscriber due to mailbox overflow.
    pub fn dropped_count(&self) -> u64 {
        self.mailbox.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unregister(self.mailbox.id);
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
