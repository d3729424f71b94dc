//! Finds and terminates supervised processes left behind by a daemon that
//! crashed before it could shut them down cleanly itself.

use std::time::Duration;

use chrono::{DateTime, Utc};
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;

use crate::session::SessionEntry;

/// How close a process's actual start time must be to the session file's
/// recorded `startedAt` to be treated as the same process (clock rounding
/// tolerance), rather than a different process that has since reused the
/// pid.
const START_TIME_TOLERANCE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapOutcome {
    /// The pid was alive, its start time matched, and a terminate signal
    /// was sent to its process group.
    Terminated,
    /// No live process at this pid matched the recorded entry; nothing to do.
    AlreadyDead,
}

/// Reaps one session entry: if a live process still occupies `entry.pid`
/// and its actual start time is within tolerance of what was recorded,
/// sends a terminate signal to its process group.
pub fn reap_entry(entry: &SessionEntry) -> ReapOutcome {
    let pid = Pid::from_raw(entry.pid as i32);
    if kill(pid, None).is_err() {
        return ReapOutcome::AlreadyDead;
    }
    match process_start_time(entry.pid) {
        Some(actual) if start_times_match(actual, entry.started_at) => {
            let _ = killpg(pid, Signal::SIGTERM);
            ReapOutcome::Terminated
        }
        _ => ReapOutcome::AlreadyDead,
    }
}

fn start_times_match(actual: DateTime<Utc>, recorded: DateTime<Utc>) -> bool {
    let delta = (actual - recorded).num_milliseconds().unsigned_abs();
    Duration::from_millis(delta) <= START_TIME_TOLERANCE
}

/// Reads a process's start time from `/proc`, combining the system boot
/// time (`/proc/stat`'s `btime`) with the process's `starttime` field
/// (clock ticks since boot, field 22 of `/proc/<pid>/stat`).
fn process_start_time(pid: u32) -> Option<DateTime<Utc>> {
    let boot_time = boot_time_epoch_secs()?;
    let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    let close_paren = stat.rfind(')')?;
    let rest = stat.get(close_paren + 2..)?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    // Field 22 overall; field 3 is `fields[0]` here (after `comm)`), so
    // field N is `fields[N-3]`.
    let starttime_ticks: u64 = fields.get(22 - 3)?.parse().ok()?;
    let ticks_per_sec = 100u64;
    let epoch_secs = boot_time + (starttime_ticks / ticks_per_sec);
    let millis_in_sec = (starttime_ticks % ticks_per_sec) * (1000 / ticks_per_sec);
    DateTime::from_timestamp(epoch_secs as i64, (millis_in_sec * 1_000_000) as u32)
}

fn boot_time_epoch_secs() -> Option<u64> {
    let stat = std::fs::read_to_string("/proc/stat").ok()?;
    stat.lines()
        .find_map(|line| line.strip_prefix("btime "))
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_times_within_tolerance_match() {
        let recorded = DateTime::from_timestamp(1_000, 0).unwrap();
        let actual = DateTime::from_timestamp(1_001, 500_000_000).unwrap();
        assert!(start_times_match(actual, recorded));
    }

    #[test]
    fn start_times_outside_tolerance_do_not_match() {
        let recorded = DateTime::from_timestamp(1_000, 0).unwrap();
        let actual = DateTime::from_timestamp(1_010, 0).unwrap();
        assert!(!start_times_match(actual, recorded));
    }

    #[test]
    fn reaping_a_pid_that_does_not_exist_is_already_dead() {
        let entry = SessionEntry { service: "x".into(), pid: u32::MAX, started_at: Utc::now() };
        assert_eq!(reap_entry(&entry), ReapOutcome::AlreadyDead);
    }

    #[test]
    fn boot_time_parses_from_a_realistic_proc_stat() {
        let sample = "cpu  100 200 300\nctxt 12345\nbtime 1700000000\nprocesses 100\n";
        let parsed = sample
            .lines()
            .find_map(|line| line.strip_prefix("btime "))
            .and_then(|v| v.trim().parse::<u64>().ok());
        assert_eq!(parsed, Some(1_700_000_000));
    }
}
