//! A minimal line-oriented control surface: translates `stdin` lines into
//! `Scheduler` calls when stdin is a TTY. Not a TUI — a view is any
//! consumer that subscribes to the bus and renders; this one renders
//! nothing but the raw log stream `main` already prints.

use std::io::IsTerminal;
use std::sync::Arc;

use fuku_daemon::ShutdownCoordinator;
use fuku_engine::Scheduler;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Reads `stdin` lines until EOF or `quit`, dispatching each recognized
/// command to the scheduler. Returns when the user types `quit` or stdin
/// closes; does nothing (returns immediately) when stdin isn't a TTY.
pub async fn run(scheduler: Scheduler, shutdown: Arc<ShutdownCoordinator>) {
    if !std::io::stdin().is_terminal() {
        return;
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.trim().splitn(2, char::is_whitespace);
        match (parts.next(), parts.next().map(str::trim)) {
            (Some("restart"), Some(service)) => scheduler.restart_service(service).await,
            (Some("stop"), Some(service)) => scheduler.stop_service(service).await,
            (Some("start"), Some(service)) => scheduler.start_service(service).await,
            (Some("quit"), _) => {
                shutdown.trigger().await;
                return;
            }
            (Some(other), _) if !other.is_empty() => {
                println!("unrecognized command: {other}");
            }
            _ => {}
        }
    }
}
