//! Spawns a child in its own process group, captures stdout/stderr line by
//! line, and reaps it.

use std::os::unix::process::CommandExt as _;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::OnceCell;

use fuku_core::{Command as ServiceCommand, ServiceDescriptor, Stream};

use crate::env::merged_environment;
use crate::error::SpawnError;

/// Callback invoked once per captured output line: `(stream, line)`.
pub type LineSink = Arc<dyn Fn(Stream, String) + Send + Sync>;

/// How a process exited, and whether it was expected: a non-zero exit with
/// no prior call to `stop` is a crash, an exit after `stop` (any code, or
/// via signal) is graceful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitResult {
    Exited { code: i32, graceful: bool },
    Signaled { signal: i32, graceful: bool },
    WaitFailed(String),
}

impl ExitResult {
    /// A crash is a non-graceful non-zero exit.
    pub fn is_crash(&self) -> bool {
        match self {
            ExitResult::Exited { code, graceful } => *code != 0 && !graceful,
            ExitResult::Signaled { graceful, .. } => !graceful,
            ExitResult::WaitFailed(_) => true,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExitResult::Exited { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// A spawned, supervised child process.
///
/// A service has at most one running child at a time — enforced by
/// callers holding one `Handle` per service and serializing `spawn`
/// through their own per-service state, not by this type itself.
pub struct Handle {
    pid: u32,
    started_at_ms: u64,
    child: AsyncMutex<Option<Child>>,
    exit: OnceCell<ExitResult>,
    graceful_stop: AtomicBool,
}

impl Handle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    /// Blocks until the child is reaped. Idempotent: subsequent calls
    /// return the cached result.
    pub async fn wait(&self) -> ExitResult {
        if let Some(result) = self.exit.get() {
            return result.clone();
        }
        let mut guard = self.child.lock().await;
        if let Some(result) = self.exit.get() {
            return result.clone();
        }
        let Some(child) = guard.as_mut() else {
            return ExitResult::WaitFailed("child already reaped without a cached result".into());
        };
        let graceful = self.graceful_stop.load(Ordering::SeqCst);
        let result = match child.wait().await {
            Ok(status) => status_to_result(status, graceful),
            Err(e) => ExitResult::WaitFailed(e.to_string()),
        };
        *guard = None;
        let _ = self.exit.set(result.clone());
        result
    }

    /// Sends the termination signal to the whole process group, waits up to
    /// `grace`, then escalates to a kill signal.
    ///
    /// After this returns, no descendant of the spawned child is alive
    /// under normal kernel behavior.
    pub async fn stop(&self, grace: Duration) -> ExitResult {
        self.graceful_stop.store(true, Ordering::SeqCst);
        let pgid = Pid::from_raw(self.pid as i32);
        if let Err(e) = killpg(pgid, Signal::SIGTERM) {
            tracing::debug!(pid = self.pid, error = %e, "SIGTERM to process group failed (already dead?)");
        }
        match tokio::time::timeout(grace, self.wait()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(pid = self.pid, "grace period elapsed, sending SIGKILL");
                if let Err(e) = killpg(pgid, Signal::SIGKILL) {
                    tracing::debug!(pid = self.pid, error = %e, "SIGKILL to process group failed");
                }
                self.wait().await
            }
        }
    }
}

fn status_to_result(status: std::process::ExitStatus, graceful: bool) -> ExitResult {
    use std::os::unix::process::ExitStatusExt;
    if let Some(code) = status.code() {
        ExitResult::Exited { code, graceful }
    } else if let Some(signal) = status.signal() {
        ExitResult::Signaled { signal, graceful }
    } else {
        ExitResult::WaitFailed("exit status had neither code nor signal".into())
    }
}

/// Spawns `descriptor`'s command as a new process-group leader, pipes
/// stdout/stderr, and starts the output pumps.
///
/// `clock_ms` supplies the start timestamp (so callers can inject a
/// [`fuku_core::Clock`] for deterministic tests).
pub fn spawn(
    descriptor: &ServiceDescriptor,
    clock_ms: u64,
    sink: LineSink,
) -> Result<Handle, SpawnError> {
    if !descriptor.working_dir.exists() {
        return Err(SpawnError::MissingWorkingDir(descriptor.working_dir.clone()));
    }
    spawn_command(&descriptor.command, &descriptor.working_dir, &descriptor.environment, clock_ms, sink)
}

fn spawn_command(
    command: &ServiceCommand,
    working_dir: &Path,
    environment: &std::collections::BTreeMap<String, String>,
    clock_ms: u64,
    sink: LineSink,
) -> Result<Handle, SpawnError> {
    let (program, args) = command.program_and_args();
    let env = merged_environment(environment);
    let mut cmd = Command::new(&program);
    cmd.args(&args)
        .current_dir(working_dir)
        .env_clear()
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);
    // Safe process-group creation: no pre_exec closure required, so this
    // doesn't need `unsafe` (which the workspace forbids).
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|source| SpawnError::Exec { program: program.clone(), source })?;
    let pid = child.id().unwrap_or_default();

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    if let Some(stdout) = stdout {
        spawn_pump(stdout, Stream::Stdout, sink.clone());
    }
    if let Some(stderr) = stderr {
        spawn_pump(stderr, Stream::Stderr, sink);
    }

    Ok(Handle {
        pid,
        started_at_ms: clock_ms,
        child: AsyncMutex::new(Some(child)),
        exit: OnceCell::new(),
        graceful_stop: AtomicBool::new(false),
    })
}

fn spawn_pump<R>(reader: R, stream: Stream, sink: LineSink)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => sink(stream, strip_trailing_cr(line)),
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, ?stream, "output pump read error");
                    break;
                }
            }
        }
    });
}

fn strip_trailing_cr(mut line: String) -> String {
    if line.ends_with('\r') {
        line.pop();
    }
    line
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
