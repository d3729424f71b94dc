use thiserror::Error;

/// Errors raised while reading and parsing a `fuku.toml` document.
///
/// Semantic validation (unknown dependency, cycle, bad probe) is not this
/// crate's job — it happens once the Scheduler resolves a profile, and is
/// reported as `fuku_core::ConfigError` instead.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {path:?}: {source}")]
    Io { path: std::path::PathBuf, source: std::io::Error },

    #[error("could not parse {path:?} as TOML: {source}")]
    Parse { path: std::path::PathBuf, source: toml::de::Error },

    #[error("service {0:?} declared with no command")]
    MissingCommand(String),
}
