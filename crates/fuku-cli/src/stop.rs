//! `fuku stop`: reaps any processes left running by a prior session (one
//! that crashed, or was killed, before its own Shutdown Coordinator ran).

use fuku_core::SessionError;
use fuku_storage::orphan::{reap_entry, ReapOutcome};
use fuku_storage::SessionTracker;
use tracing::{info, warn};

use crate::exit_error::ExitError;
use crate::paths;

pub fn run() -> Result<(), ExitError> {
    let tracker = SessionTracker::new(paths::session_path());

    let session = match tracker.load() {
        Ok(session) => session,
        Err(SessionError::NotFound) => {
            info!("no session file found, nothing to stop");
            return Ok(());
        }
        Err(e) => {
            warn!(error = %e, "session file unreadable, nothing can be reaped");
            return Ok(());
        }
    };

    for entry in &session.entries {
        match reap_entry(entry) {
            ReapOutcome::Terminated => info!(service = %entry.service, pid = entry.pid, "terminated"),
            ReapOutcome::AlreadyDead => info!(service = %entry.service, pid = entry.pid, "already dead"),
        }
    }

    if let Err(e) = tracker.delete() {
        warn!(error = %e, "failed to delete session file");
    }

    Ok(())
}
