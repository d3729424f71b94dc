#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The session file: tracks which PIDs this daemon has spawned so a later
//! `stop` invocation can reap them even if the daemon itself crashed.

pub mod orphan;
pub mod session;

pub use fuku_core::SessionError;
pub use orphan::{reap_entry, ReapOutcome};
pub use session::{SessionEntry, SessionFile, SessionTracker};
