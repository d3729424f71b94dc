//! The Log Broadcast Hub: fans the concatenated output of every supervised
//! service out to N subscribers, each of which may filter by service name.
//!
//! Shaped like [`fuku_core::bus::EventBus`]: a bounded mailbox per
//! subscriber, `Notify`-driven wakeups, drop-oldest-on-overflow so a slow
//! subscriber never makes a publisher block. The difference here is the
//! payload (raw log lines, not `Event`s) and the per-subscriber service
//! filter from the wire protocol's `subscribe` message.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing::info;

use fuku_wire::LogFrame;

/// Default bound on one subscriber's outbox.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Default bound on the hub's own intake queue.
pub const DEFAULT_INTAKE_CAPACITY: usize = 1024;

/// How often aggregate drop counters are flushed to `tracing`.
pub const DROP_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

struct Outbox {
    id: u64,
    services: Vec<String>,
    queue: Mutex<VecDeque<LogFrame>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl Outbox {
    fn wants(&self, service: &str) -> bool {
        self.services.is_empty() || self.services.iter().any(|s| s == service)
    }

    fn push(&self, frame: LogFrame) {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(frame);
        drop(queue);
        self.notify.notify_one();
    }

    fn try_pop(&self) -> Option<LogFrame> {
        self.queue.lock().pop_front()
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        self.notify.notify_one();
    }
}

enum Intake {
    Register { services: Vec<String>, reply: mpsc::Sender<Arc<OutboxHandle>> },
    Unregister { id: u64 },
    Broadcast { frame: LogFrame },
}

/// Cloneable handle given to a subscriber worker: pull frames from it until
/// it reports closed.
pub struct OutboxHandle {
    outbox: Arc<Outbox>,
}

impl OutboxHandle {
    /// Waits for the next frame, or `None` once the hub has closed this
    /// subscriber's outbox (on shutdown or `Unregister`).
    pub async fn recv(&self) -> Option<LogFrame> {
        loop {
            if let Some(frame) = self.outbox.try_pop() {
                return Some(frame);
            }
            if self.outbox.is_closed() {
                return None;
            }
            self.outbox.notify.notified().await;
        }
    }

    /// Count of frames dropped for this subscriber due to outbox overflow.
    pub fn dropped_count(&self) -> u64 {
        self.outbox.dropped.load(Ordering::Relaxed)
    }
}

/// Handle to the hub's intake queue. `Broadcast` is non-blocking: callers
/// (the Scheduler's `LogSink`) never wait on a subscriber.
#[derive(Clone)]
pub struct Hub {
    intake: mpsc::Sender<Intake>,
}

impl Hub {
    /// Spawns the hub's dispatch loop and returns a handle to it. The loop
    /// runs until `cancel` fires, at which point every live subscriber's
    /// outbox is closed and the loop returns.
    pub fn spawn(cancel: CancellationToken) -> Self {
        let (tx, mut rx) = mpsc::channel(DEFAULT_INTAKE_CAPACITY);
        tokio::spawn(async move {
            let mut outboxes: Vec<Arc<Outbox>> = Vec::new();
            let mut next_id: u64 = 0;
            let mut dropped_total: u64 = 0;
            let mut flush = tokio::time::interval(DROP_FLUSH_INTERVAL);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        for outbox in &outboxes {
                            outbox.close();
                        }
                        return;
                    }
                    _ = flush.tick() => {
                        let tick_total: u64 = outboxes.iter().map(|o| o.dropped.load(Ordering::Relaxed)).sum();
                        if tick_total > dropped_total {
                            info!(dropped = tick_total - dropped_total, "hub subscriber drops in last interval");
                            dropped_total = tick_total;
                        }
                    }
                    msg = rx.recv() => {
                        let Some(msg) = msg else { return };
                        match msg {
                            Intake::Register { services, reply } => {
                                let id = next_id;
                                next_id += 1;
                                let outbox = Arc::new(Outbox {
                                    id,
                                    services,
                                    queue: Mutex::new(VecDeque::new()),
                                    capacity: DEFAULT_OUTBOX_CAPACITY,
                                    notify: Notify::new(),
                                    dropped: AtomicU64::new(0),
                                    closed: AtomicBool::new(false),
                                });
                                outboxes.push(outbox.clone());
                                let _ = reply.send(Arc::new(OutboxHandle { outbox })).await;
                            }
                            Intake::Unregister { id } => {
                                if let Some(pos) = outboxes.iter().position(|o| o.id == id) {
                                    outboxes.remove(pos).close();
                                }
                            }
                            Intake::Broadcast { frame } => {
                                for outbox in &outboxes {
                                    if outbox.wants(&frame.service) {
                                        outbox.push(frame.clone());
                                    }
                                }
                            }
                        }
                    }
                }
            }
        });
        Self { intake: tx }
    }

    /// Registers a new subscriber filtered to `services` (empty means
    /// "all") and returns a handle it can pull frames from.
    pub async fn register(&self, services: Vec<String>) -> Option<(u64, Arc<OutboxHandle>)> {
        let (reply_tx, mut reply_rx) = mpsc::channel(1);
        self.intake.send(Intake::Register { services, reply: reply_tx }).await.ok()?;
        let handle = reply_rx.recv().await?;
        let id = handle.outbox.id;
        Some((id, handle))
    }

    pub fn unregister(&self, id: u64) {
        let intake = self.intake.clone();
        tokio::spawn(async move {
            let _ = intake.send(Intake::Unregister { id }).await;
        });
    }

    /// Non-blocking: if the intake queue is full, the send fails silently
    /// and the line is dropped. Publishers (the Scheduler's `LogSink`)
    /// must never block.
    pub fn broadcast(&self, service: &str, message: &str) {
        let frame = LogFrame::new(service, message);
        if self.intake.try_send(Intake::Broadcast { frame }).is_err() {
            tracing::debug!(service, "hub intake queue full, dropping line");
        }
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
