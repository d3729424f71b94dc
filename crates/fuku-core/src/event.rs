//! Event types published on the [`crate::bus::EventBus`].
//!
//! The set of event kinds is closed; `name()` and
//! `log_summary()` follow the dispatch-table pattern the rest of this
//! workspace's event enums use.

use serde::{Deserialize, Serialize};

use crate::model::{ServiceState, Stream};

/// The five scheduler phases, in the order they're entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Discovery,
    Startup,
    Running,
    Shutdown,
    Stopped,
}

crate::simple_display! {
    Phase {
        Discovery => "discovery",
        Startup => "startup",
        Running => "running",
        Shutdown => "shutdown",
        Stopped => "stopped",
    }
}

/// Events published by the Scheduler and other components. The set of
/// kinds is closed: new kinds require a new variant, not a free-form
/// payload.
///
/// Serializes with `{"type": "event:name", ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "profile:resolved")]
    ProfileResolved { profile: String, services: Vec<String> },

    #[serde(rename = "phase:changed")]
    PhaseChanged { phase: Phase },

    #[serde(rename = "tier:starting")]
    TierStarting { tier: String },

    #[serde(rename = "tier:ready")]
    TierReady { tier: String },

    #[serde(rename = "service:starting")]
    ServiceStarting { service: String, pid: u32, started_at_ms: u64 },

    #[serde(rename = "service:ready")]
    ServiceReady { service: String },

    #[serde(rename = "service:failed")]
    ServiceFailed { service: String, reason: String },

    #[serde(rename = "service:stopped")]
    ServiceStopped { service: String, exit_code: Option<i32>, graceful: bool },

    #[serde(rename = "service:state")]
    ServiceState { service: String, state: ServiceState },

    #[serde(rename = "log:line")]
    LogLine { service: String, stream: Stream, line: String },

    /// Periodic CPU%/RSS sample for a running service. Not emitted unless
    /// something actually samples (the Scheduler only does so while a
    /// subscriber has asked for it), so bus traffic stays quiet by default.
    #[serde(rename = "service:resources")]
    ServiceResources { service: String, cpu_percent: f32, resident_bytes: u64 },

    #[serde(rename = "signal:caught")]
    SignalCaught,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ProfileResolved { .. } => "profile:resolved",
            Event::PhaseChanged { .. } => "phase:changed",
            Event::TierStarting { .. } => "tier:starting",
            Event::TierReady { .. } => "tier:ready",
            Event::ServiceStarting { .. } => "service:starting",
            Event::ServiceReady { .. } => "service:ready",
            Event::ServiceFailed { .. } => "service:failed",
            Event::ServiceStopped { .. } => "service:stopped",
            Event::ServiceState { .. } => "service:state",
            Event::LogLine { .. } => "log:line",
            Event::ServiceResources { .. } => "service:resources",
            Event::SignalCaught => "signal:caught",
        }
    }

    /// One-line human summary, used by the no-ui stdout formatter and by
    /// `tracing` spans — never by the wire protocol, which serializes the
    /// full struct instead.
    pub fn log_summary(&self) -> String {
        match self {
            Event::ProfileResolved { profile, services } => {
                format!("profile {profile:?} resolved to {} service(s)", services.len())
            }
            Event::PhaseChanged { phase } => format!("phase -> {phase}"),
            Event::TierStarting { tier } => format!("tier {tier} starting"),
            Event::TierReady { tier } => format!("tier {tier} ready"),
            Event::ServiceStarting { service, pid, .. } => {
                format!("{service} starting (pid {pid})")
            }
            Event::ServiceReady { service } => format!("{service} ready"),
            Event::ServiceFailed { service, reason } => format!("{service} failed: {reason}"),
            Event::ServiceStopped { service, exit_code, graceful } => format!(
                "{service} stopped (exit={:?} graceful={graceful})",
                exit_code
            ),
            Event::ServiceState { service, state } => format!("{service} -> {state}"),
            Event::LogLine { service, .. } => format!("{service} log line"),
            Event::ServiceResources { service, cpu_percent, resident_bytes } => {
                format!("{service} cpu={cpu_percent:.1}% rss={}KiB", resident_bytes / 1024)
            }
            Event::SignalCaught => "signal caught".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
