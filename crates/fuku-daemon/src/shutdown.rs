//! The Shutdown Coordinator: owns the session's single cancellation token
//! and runs the seven-step teardown in strict order, wrapped in a
//! hard-deadline watchdog.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fuku_core::{Event, Phase};
use fuku_engine::Scheduler;
use fuku_storage::SessionTracker;

/// Default hard deadline on the stop/teardown steps (3-6 of the
/// sequence); on expiry, any still-running service is killed outright
/// instead of waited on.
pub const DEFAULT_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

/// Coordinates a clean shutdown across the Scheduler, the socket accept
/// loop, and the Log Broadcast Hub. Triggering is idempotent: a second
/// call to [`Self::trigger`] after the first has started is a no-op.
pub struct ShutdownCoordinator {
    scheduler: Scheduler,
    session: Arc<SessionTracker>,
    socket_cancel: CancellationToken,
    hub_cancel: CancellationToken,
    deadline: Duration,
    triggered: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new(
        scheduler: Scheduler,
        session: Arc<SessionTracker>,
        socket_cancel: CancellationToken,
        hub_cancel: CancellationToken,
    ) -> Self {
        Self {
            scheduler,
            session,
            socket_cancel,
            hub_cancel,
            deadline: DEFAULT_SHUTDOWN_DEADLINE,
            triggered: AtomicBool::new(false),
        }
    }

    /// Runs the full teardown sequence. Safe to call from multiple call
    /// sites (an OS signal handler and a user `quit`, say); only the first
    /// caller does the work, the rest return immediately.
    pub async fn trigger(&self) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return;
        }

        self.bus().publish(Event::SignalCaught);
        info!("shutdown triggered");
        self.scheduler.set_phase(Phase::Shutdown);

        if tokio::time::timeout(self.deadline, self.stop_and_teardown()).await.is_err() {
            warn!(deadline_secs = self.deadline.as_secs(), "shutdown watchdog expired, escalating");
            self.scheduler.cancellation().cancel();
        }

        self.scheduler.set_phase(Phase::Stopped);
    }

    fn bus(&self) -> &fuku_core::EventBus {
        self.scheduler.bus()
    }

    async fn stop_and_teardown(&self) {
        for tier in self.scheduler.tiers().iter().rev() {
            self.scheduler.stop_tier(tier).await;
        }

        self.socket_cancel.cancel();
        self.hub_cancel.cancel();

        if let Err(e) = self.session.delete() {
            warn!(error = %e, "failed to delete session file during shutdown");
        }
    }
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
