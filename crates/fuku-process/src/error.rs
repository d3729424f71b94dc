use thiserror::Error;

/// Errors raised while spawning a service's command.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to exec {program:?}: {source}")]
    Exec { program: String, #[source] source: std::io::Error },

    #[error("working directory {0:?} does not exist")]
    MissingWorkingDir(std::path::PathBuf),

    #[error("failed to create process group: {0}")]
    ProcessGroup(#[from] nix::Error),
}

/// Errors from OS-level signal/wait operations during `Handle::stop`.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("signal delivery failed: {0}")]
    Signal(#[source] nix::Error),

    #[error("wait failed: {0}")]
    Wait(#[source] std::io::Error),
}
