#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Process supervision: spawning a service's command in its own process
//! group, capturing its output line by line, reaping it, and sampling its
//! CPU/memory use while it runs.

pub mod env;
pub mod error;
pub mod resources;
pub mod supervisor;

pub use env::merged_environment;
pub use error::{SpawnError, SupervisorError};
pub use resources::Sampler;
pub use supervisor::{spawn, ExitResult, Handle, LineSink};
