//! Error taxonomy shared by the runner core.
//!
//! Each component in the workspace defines its own narrow error enum (see
//! `fuku-process::SpawnError`, `fuku-readiness::ProbeError`,
//! `fuku-storage::SessionError`, ...); this module holds only the kinds
//! that cut across component boundaries — config/dependency resolution
//! and the IPC protocol — plus the hint text the CLI prints alongside a
//! per-service failure.

use thiserror::Error;

/// Errors raised while resolving a profile into a schedulable service set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown profile {0:?}")]
    UnknownProfile(String),

    #[error("profile references unknown service {0:?}")]
    UnknownService(String),

    #[error("service {0:?} depends on unknown service {1:?}")]
    UnknownDependency(String, String),

    #[error("dependency cycle detected: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("invalid readiness probe for service {service:?}: {reason}")]
    BadProbe { service: String, reason: String },

    #[error("duplicate service name {0:?}")]
    DuplicateService(String),

    #[error("tier_override for service {service:?} places it at or before its dependency {dependency:?}")]
    TierOverrideViolatesDependency { service: String, dependency: String },
}

/// Errors from the socket wire protocol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed JSON frame: {0}")]
    MalformedJson(String),

    #[error("first frame must be a subscribe request")]
    ExpectedSubscribe,

    #[error("frame of {0} bytes exceeds the {1} byte limit")]
    FrameTooLarge(usize, usize),
}

/// Errors from the session file.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session file found")]
    NotFound,

    #[error("session file is corrupted: {0}")]
    Corrupted(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A short, user-facing suggestion attached to a per-service failure.
pub fn hint_for(kind: FailureKind) -> Option<&'static str> {
    match kind {
        FailureKind::PortInUse => Some("check with lsof"),
        FailureKind::PermissionDenied => Some("check permissions"),
        FailureKind::ConnectionRefused => Some("check dependent services"),
        FailureKind::Timeout => Some("increase readiness deadline"),
        FailureKind::Other => None,
    }
}

/// Coarse classification of a failure cause, used only to pick a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    PortInUse,
    PermissionDenied,
    ConnectionRefused,
    Timeout,
    Other,
}
