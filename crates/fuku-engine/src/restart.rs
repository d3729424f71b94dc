//! Restart-policy backoff: exponential from 1s, capped at 30s, reset after
//! 60s of uninterrupted uptime. A manual `Restart` intent resets the
//! backoff unconditionally — user intent overrides automatic policy.

use std::time::Duration;

use fuku_core::RestartPolicy;
use fuku_process::ExitResult;

pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);
pub const BACKOFF_RESET_UPTIME: Duration = Duration::from_secs(60);

/// Per-service backoff counter, owned by the Scheduler alongside the rest
/// of a service's runtime state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Backoff {
    attempt: u32,
}

impl Backoff {
    /// The delay before the next respawn attempt, advancing the counter.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt.min(8)).unwrap_or(u32::MAX);
        let delay = INITIAL_BACKOFF.saturating_mul(factor).min(MAX_BACKOFF);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Whether an exit while a service was `Running` should trigger a respawn,
/// under the given policy. Callers are responsible for only invoking this
/// on exits that weren't the result of a deliberate `Stop`.
pub fn should_respawn(policy: RestartPolicy, exit: &ExitResult) -> bool {
    match policy {
        RestartPolicy::Never => false,
        RestartPolicy::OnFailure => exit.exit_code().map(|code| code != 0).unwrap_or(true),
        RestartPolicy::Always => true,
    }
}

/// Resets `backoff` if the service stayed up for at least
/// [`BACKOFF_RESET_UPTIME`] before exiting.
pub fn maybe_reset_after_uptime(backoff: &mut Backoff, uptime: Duration) {
    if uptime >= BACKOFF_RESET_UPTIME {
        backoff.reset();
    }
}

#[cfg(test)]
#[path = "restart_tests.rs"]
mod tests;
