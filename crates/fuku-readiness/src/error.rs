use thiserror::Error;

/// Errors raised while evaluating a readiness probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("readiness deadline of {0:?} elapsed before the service became ready")]
    DeadlineElapsed(std::time::Duration),

    #[error("http probe request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("exec probe command {command:?} failed to start: {source}")]
    ExecSpawn { command: Vec<String>, #[source] source: std::io::Error },

    #[error("log pattern {0:?} did not compile as a regular expression: {1}")]
    BadPattern(String, regex::Error),

    #[error("composite probe had no sub-probes")]
    EmptyComposite,
}
