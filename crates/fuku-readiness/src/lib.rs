#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Readiness probing: evaluates a service's configured [`ReadinessProbe`]
//! against its running process until it reports ready or a deadline
//! elapses.

pub mod error;
pub mod log_tail;
pub mod probe;

pub use error::ProbeError;
pub use fuku_core::ReadinessProbe;
pub use log_tail::LogTail;
pub use probe::{wait_until_ready, Probe, ProbeContext};
