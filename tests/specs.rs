//! End-to-end coverage of a `fuku` session: spawns the real `fuku` binary
//! against a temporary `fuku.toml`, drives it with signals and a second
//! `fuku logs` process, and asserts on its stdout and exit code.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serial_test::serial;
use tempfile::TempDir;

/// An isolated home for one test: its own runtime dir (for the socket) and
/// config dir (for the session file), so parallel tests never collide on
/// the paths a real user's `$XDG_RUNTIME_DIR` would produce.
struct Harness {
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self { dir: tempfile::tempdir().expect("tempdir") }
    }

    fn write_config(&self, toml: &str) {
        std::fs::write(self.dir.path().join("fuku.toml"), toml).expect("write fuku.toml");
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin("fuku"));
        cmd.current_dir(self.dir.path())
            .env("XDG_RUNTIME_DIR", self.dir.path().join("run"))
            .env("XDG_CONFIG_HOME", self.dir.path().join("config"));
        cmd
    }

    fn run_to_completion(&self, args: &[&str]) -> Output {
        self.command().arg("run").args(args).output().expect("run fuku")
    }

    /// Spawns `fuku run` in the background with piped stdout/stderr.
    fn spawn_run(&self, args: &[&str]) -> Child {
        self.command()
            .arg("run")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn fuku run")
    }

    fn session_path(&self) -> PathBuf {
        self.dir.path().join("config").join("fuku").join("session.json")
    }
}

/// Reads lines from `reader` until one contains `needle`, or `timeout`
/// elapses (in which case it panics with whatever was read so far).
fn wait_for_line(reader: &mut impl BufRead, needle: &str, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    loop {
        if Instant::now() > deadline {
            panic!("timed out waiting for a line containing {needle:?}; saw: {seen:?}");
        }
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => continue,
            Ok(_) => {
                let trimmed = line.trim_end().to_string();
                if trimmed.contains(needle) {
                    return;
                }
                seen.push(trimmed);
            }
            Err(_) => continue,
        }
    }
}

fn wait_for_file(path: &Path, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while std::fs::metadata(path).map(|m| m.len()).unwrap_or(0) == 0 {
        if Instant::now() > deadline {
            panic!("{path:?} never appeared with contents");
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

fn signal(child: &Child, sig: Signal) {
    let _ = kill(Pid::from_raw(child.id() as i32), sig);
}

fn is_alive(pid: i32) -> bool {
    kill(Pid::from_raw(pid), None).is_ok()
}

#[test]
#[serial]
fn a_two_service_profile_starts_both_and_logs_their_output() {
    let harness = Harness::new();
    harness.write_config(
        r#"
[services.web]
command = "echo web-line && sleep 30"

[services.db]
command = "echo db-line && sleep 30"
"#,
    );

    let mut child = harness.spawn_run(&[]);
    let mut stdout = BufReader::new(child.stdout.take().expect("stdout"));

    wait_for_line(&mut stdout, "web-line", Duration::from_secs(10));
    wait_for_line(&mut stdout, "db-line", Duration::from_secs(10));

    signal(&child, Signal::SIGTERM);
    let status = child.wait().expect("wait");
    assert!(status.success(), "expected a clean exit after SIGTERM, got {status:?}");
}

#[test]
#[serial]
fn a_required_service_whose_probe_outlives_its_deadline_fails_the_session() {
    // A Delay probe longer than the service's own configured deadline: the
    // deadline bounds every probe kind uniformly, so this fails in just
    // over a second instead of riding out the 60s default.
    let harness = Harness::new();
    harness.write_config(
        r#"
[services.broken]
command = "sleep 30"
restart_policy = "never"
readiness_deadline_secs = 1

[services.broken.readiness]
kind = "delay"
duration_ms = 10000
"#,
    );

    let output = harness.run_to_completion(&[]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
#[serial]
fn a_service_that_exits_before_its_probe_is_satisfied_fails_fast() {
    let harness = Harness::new();
    harness.write_config(
        r#"
[services.broken]
command = "exit 1"
restart_policy = "never"

[services.broken.readiness]
kind = "log"
pattern = "this-never-appears-in-output"
"#,
    );

    let output = harness.run_to_completion(&[]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
#[serial]
fn a_second_instance_on_the_same_profile_reports_the_socket_is_in_use() {
    let harness = Harness::new();
    harness.write_config(
        r#"
[services.web]
command = "echo web-up && sleep 30"
"#,
    );

    let mut first = harness.spawn_run(&[]);
    let mut first_stdout = BufReader::new(first.stdout.take().expect("stdout"));
    // There's no readiness probe, so the line reaching stdout is the best
    // available signal that the socket has been bound by this point (both
    // happen during the same `run` before the Running phase is reached).
    wait_for_line(&mut first_stdout, "web-up", Duration::from_secs(10));

    let second = harness.run_to_completion(&[]);
    assert_eq!(second.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&second.stderr);
    assert!(stderr.contains("already listening"), "unexpected stderr: {stderr}");

    signal(&first, Signal::SIGTERM);
    let _ = first.wait();
}

#[test]
#[serial]
fn stop_reaps_a_process_left_behind_by_a_killed_session() {
    let harness = Harness::new();
    harness.write_config(
        r#"
[services.web]
command = "echo web-up && sleep 60"
"#,
    );

    let mut child = harness.spawn_run(&[]);
    let mut stdout = BufReader::new(child.stdout.take().expect("stdout"));
    wait_for_line(&mut stdout, "web-up", Duration::from_secs(10));

    let session = harness.session_path();
    wait_for_file(&session, Duration::from_secs(5));
    let contents = std::fs::read_to_string(&session).expect("read session");
    let parsed: serde_json::Value = serde_json::from_str(&contents).expect("parse session");
    let pid = parsed["entries"][0]["pid"].as_u64().expect("pid") as i32;
    assert!(is_alive(pid), "web should be alive before the crash");

    // Simulate a crash: kill the daemon itself without letting its own
    // shutdown sequence run, leaving `web` running as an orphan.
    signal(&child, Signal::SIGKILL);
    let _ = child.wait();
    assert!(is_alive(pid), "web should still be alive right after the daemon dies");

    let stop_output = harness.command().arg("stop").output().expect("run fuku stop");
    assert!(stop_output.status.success());

    let deadline = Instant::now() + Duration::from_secs(5);
    while is_alive(pid) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    assert!(!is_alive(pid), "web should have been reaped by stop");
}

#[test]
#[serial]
fn logs_only_streams_the_subscribed_service() {
    let harness = Harness::new();
    harness.write_config(
        r#"
[services.web]
command = "i=0; while [ $i -lt 20 ]; do i=$((i+1)); echo web-tick-$i; sleep 1; done"

[services.db]
command = "i=0; while [ $i -lt 20 ]; do i=$((i+1)); echo db-tick-$i; sleep 1; done"
"#,
    );

    let mut runner = harness.spawn_run(&[]);
    let mut runner_stdout = BufReader::new(runner.stdout.take().expect("stdout"));
    wait_for_line(&mut runner_stdout, "web-tick", Duration::from_secs(10));

    let mut logs = harness.command();
    let mut logs_child = logs.arg("logs").arg("web").stdout(Stdio::piped()).spawn().expect("spawn fuku logs");
    let mut logs_stdout = BufReader::new(logs_child.stdout.take().expect("logs stdout"));

    let deadline = Instant::now() + Duration::from_secs(8);
    let mut saw_web = false;
    while Instant::now() < deadline && !saw_web {
        let mut line = String::new();
        if logs_stdout.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        assert!(!line.contains("db-tick"), "a web-only subscription must never see db lines: {line:?}");
        if line.contains("web-tick") {
            saw_web = true;
        }
    }
    assert!(saw_web, "expected to see at least one web log line");

    let _ = logs_child.kill();
    let _ = logs_child.wait();
    signal(&runner, Signal::SIGTERM);
    let _ = runner.wait();
}
