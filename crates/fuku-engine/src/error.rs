use fuku_core::ConfigError;
use thiserror::Error;

/// Errors that can abort the Startup phase.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("tier {tier} failed to become ready under require-all-ready")]
    RequireAllReadyViolation { tier: String },
}
