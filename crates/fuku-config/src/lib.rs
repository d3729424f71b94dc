#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Thin TOML loader: turns a `fuku.toml` document into the
//! `fuku_core::ServiceDescriptor`/`Profile` values the rest of the
//! workspace schedules. No semantic validation here — cycle detection and
//! profile resolution belong to `fuku-engine`.

mod document;
mod error;
mod loader;

pub use error::LoadError;
pub use loader::load;
