//! An error that carries the process exit code it should produce, so
//! `main` can print one "Error: ..." line to stderr and exit without
//! calling `std::process::exit` from deep inside a command handler.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Configuration or startup failures and per-service failures under
    /// `require-all-ready` both exit 1 (spec §6/§7).
    pub fn startup(message: impl Into<String>) -> Self {
        Self::new(1, message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}
