//! The data model: service descriptors, runtime state, tiers, log entries,
//! and the readiness probe union.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a crashed/exited service should be handled while `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    Never,
    OnFailure,
    #[default]
    Always,
}

crate::simple_display! {
    RestartPolicy {
        Never => "never",
        OnFailure => "on-failure",
        Always => "always",
    }
}

/// A readiness probe, tagged union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ReadinessProbe {
    Log {
        pattern: String,
    },
    Tcp {
        host: String,
        port: u16,
    },
    Http {
        url: String,
        #[serde(default = "default_expected_statuses")]
        expected_status: Vec<u16>,
        #[serde(default = "default_http_timeout_ms")]
        timeout_ms: u64,
    },
    Exec {
        command: Vec<String>,
        #[serde(default = "default_exec_interval_ms")]
        interval_ms: u64,
    },
    Delay {
        duration_ms: u64,
    },
    CompositeAll {
        probes: Vec<ReadinessProbe>,
    },
    CompositeAny {
        probes: Vec<ReadinessProbe>,
    },
}

fn default_expected_statuses() -> Vec<u16> {
    vec![200]
}

fn default_http_timeout_ms() -> u64 {
    1_000
}

fn default_exec_interval_ms() -> u64 {
    500
}

/// Default per-service readiness deadline: 60s.
pub const DEFAULT_READINESS_DEADLINE: Duration = Duration::from_secs(60);

/// Default shutdown grace period (`Handle::Stop`, used when a
/// descriptor doesn't override it).
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Immutable, configured description of one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub working_dir: PathBuf,
    pub command: Command,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub readiness: Option<ReadinessProbe>,
    /// Global deadline bounding every probe kind, including `Delay`.
    #[serde(default = "default_readiness_deadline_secs")]
    pub readiness_deadline_secs: u64,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default)]
    pub tier_override: Option<u32>,
    /// A service whose readiness failure does not violate `require-all-ready`.
    #[serde(default)]
    pub optional: bool,
}

fn default_shutdown_grace_secs() -> u64 {
    DEFAULT_SHUTDOWN_GRACE.as_secs()
}

fn default_readiness_deadline_secs() -> u64 {
    DEFAULT_READINESS_DEADLINE.as_secs()
}

impl ServiceDescriptor {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn readiness_deadline(&self) -> Duration {
        Duration::from_secs(self.readiness_deadline_secs)
    }
}

/// Either an argv vector or a shell string run via `sh -c`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    Argv(Vec<String>),
    Shell(String),
}

impl Command {
    /// Splits into a `(program, args)` pair suitable for `tokio::process::Command`.
    /// Shell strings are run via `sh -c`.
    pub fn program_and_args(&self) -> (String, Vec<String>) {
        match self {
            Command::Argv(argv) => {
                let mut iter = argv.iter().cloned();
                let program = iter.next().unwrap_or_default();
                (program, iter.collect())
            }
            Command::Shell(s) => ("sh".to_string(), vec!["-c".to_string(), s.clone()]),
        }
    }
}

/// A named subset of services, resolved at config load.
///
/// A profile both *selects* which services run and narrows dependency
/// resolution to just that subset's transitive closure — a service outside
/// the active profile is neither started nor treated as a dependency that
/// needs to become ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub services: Vec<String>,
    #[serde(default)]
    pub require_all_ready: bool,
}

/// Runtime lifecycle state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceState {
    Pending,
    Starting,
    Initializing,
    Ready,
    Running,
    Stopping,
    Stopped,
    Failed,
    Restarting,
}

crate::simple_display! {
    ServiceState {
        Pending => "pending",
        Starting => "starting",
        Initializing => "initializing",
        Ready => "ready",
        Running => "running",
        Stopping => "stopping",
        Stopped => "stopped",
        Failed => "failed",
        Restarting => "restarting",
    }
}

/// A CPU%/resident-memory sample taken once per second while a process is
/// alive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    pub cpu_percent: f32,
    pub resident_bytes: u64,
}

/// A tier: a maximal set of services with no unresolved dependency between
/// them. Tiers are totally ordered by `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub index: u32,
    pub services: Vec<String>,
}

impl Tier {
    pub fn name(&self) -> String {
        format!("t{}", self.index)
    }
}

/// Which pipe a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
}

/// One captured line of child output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp_ms: u64,
    pub service: String,
    pub stream: Stream,
    pub line: String,
}

#[cfg(any(test, feature = "test-support"))]
pub mod builders {
    use super::*;

    crate::builder! {
        pub struct ServiceDescriptorBuilder => ServiceDescriptor {
            into { name: String = "svc" }
            set { working_dir: PathBuf = PathBuf::from(".") }
            set { command: Command = Command::Shell("true".to_string()) }
            set { environment: BTreeMap<String, String> = BTreeMap::new() }
            set { dependencies: Vec<String> = Vec::new() }
            option { readiness: ReadinessProbe = None }
            set { readiness_deadline_secs: u64 = DEFAULT_READINESS_DEADLINE.as_secs() }
            set { restart_policy: RestartPolicy = RestartPolicy::Never }
            set { shutdown_grace_secs: u64 = 10 }
            option { tier_override: u32 = None }
            set { optional: bool = false }
        }
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
