//! Evaluates a [`ReadinessProbe`] against a running service and drives the
//! poll-with-backoff loop up to a deadline.

use std::time::Duration;

use async_trait::async_trait;
use fuku_core::{ReadinessProbe, SharedClock};
use regex::Regex;

use crate::error::ProbeError;
use crate::log_tail::LogTail;

/// The shared resources a probe needs to evaluate itself once.
pub struct ProbeContext {
    pub service: String,
    pub clock: SharedClock,
    pub log_tail: LogTail,
    pub http: reqwest::Client,
    /// When this context was created — the `Delay` probe measures against
    /// this rather than its own per-call clock read, since each call to
    /// `is_ready` must see the same starting point.
    started_at: std::time::Instant,
}

impl ProbeContext {
    pub fn new(service: impl Into<String>, clock: SharedClock, log_tail: LogTail) -> Self {
        let started_at = clock.now();
        Self { service: service.into(), clock, log_tail, http: reqwest::Client::new(), started_at }
    }
}

/// One-shot readiness check. Implementations must not block past a single
/// attempt — [`wait_until_ready`] owns the retry loop.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn is_ready(&self, ctx: &ProbeContext) -> Result<bool, ProbeError>;
}

#[async_trait]
impl Probe for ReadinessProbe {
    async fn is_ready(&self, ctx: &ProbeContext) -> Result<bool, ProbeError> {
        match self {
            ReadinessProbe::Log { pattern } => {
                let re = Regex::new(pattern).map_err(|e| ProbeError::BadPattern(pattern.clone(), e))?;
                // A single non-blocking check; wait_until_ready supplies the
                // polling cadence. We race the blocking wait against an
                // effectively-zero timeout so a match already in the
                // buffer is picked up without waiting for the next line.
                Ok(tokio::time::timeout(Duration::from_millis(1), ctx.log_tail.wait_for_match(&re))
                    .await
                    .is_ok())
            }
            ReadinessProbe::Tcp { host, port } => {
                let addr = format!("{host}:{port}");
                Ok(tokio::time::timeout(Duration::from_millis(500), tokio::net::TcpStream::connect(&addr))
                    .await
                    .map(|r| r.is_ok())
                    .unwrap_or(false))
            }
            ReadinessProbe::Http { url, expected_status, timeout_ms } => {
                let request = ctx.http.get(url).timeout(Duration::from_millis(*timeout_ms));
                match request.send().await {
                    Ok(response) => Ok(expected_status.contains(&response.status().as_u16())),
                    Err(_) => Ok(false),
                }
            }
            ReadinessProbe::Exec { command, .. } => {
                let Some(program) = command.first() else { return Ok(false) };
                let status = tokio::process::Command::new(program)
                    .args(&command[1..])
                    .stdin(std::process::Stdio::null())
                    .stdout(std::process::Stdio::null())
                    .stderr(std::process::Stdio::null())
                    .status()
                    .await;
                Ok(status.map(|s| s.success()).unwrap_or(false))
            }
            ReadinessProbe::Delay { duration_ms } => {
                let elapsed = ctx.clock.now().saturating_duration_since(ctx.started_at);
                Ok(elapsed >= Duration::from_millis(*duration_ms))
            }
            ReadinessProbe::CompositeAll { probes } => {
                if probes.is_empty() {
                    return Err(ProbeError::EmptyComposite);
                }
                for probe in probes {
                    if !probe.is_ready(ctx).await? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ReadinessProbe::CompositeAny { probes } => {
                if probes.is_empty() {
                    return Err(ProbeError::EmptyComposite);
                }
                for probe in probes {
                    if probe.is_ready(ctx).await? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

/// Polls `probe` until it reports ready or `deadline` elapses, using an
/// exponential backoff (100ms initial, capped at 2s) between attempts.
pub async fn wait_until_ready(
    probe: &ReadinessProbe,
    ctx: &ProbeContext,
    deadline: Duration,
) -> Result<(), ProbeError> {
    const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
    const MAX_BACKOFF: Duration = Duration::from_secs(2);

    let start = ctx.clock.now();
    let mut backoff = INITIAL_BACKOFF;
    loop {
        if probe.is_ready(ctx).await? {
            return Ok(());
        }
        let elapsed = ctx.clock.now().saturating_duration_since(start);
        if elapsed >= deadline {
            return Err(ProbeError::DeadlineElapsed(deadline));
        }
        let remaining = deadline - elapsed;
        tokio::time::sleep(backoff.min(remaining)).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
