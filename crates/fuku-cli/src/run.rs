//! `fuku [run] [profile] [--no-ui]`: loads `fuku.toml`, starts the
//! requested profile, and streams its logs until shutdown.
//!
//! There is no TUI rendering engine in this workspace (an explicit
//! non-goal), so `--no-ui` and its absence behave identically: both print
//! the formatted log stream described in spec §6.

use std::path::Path;
use std::sync::Arc;

use fuku_core::{ConfigError, Event, EventBus, Profile, SystemClock};
use fuku_daemon::{Hub, ShutdownCoordinator};
use fuku_engine::{LogSink, Scheduler};
use fuku_storage::SessionTracker;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::exit_error::ExitError;
use crate::formatter::Formatter;
use crate::{controller, paths};

const CONFIG_FILE: &str = "fuku.toml";

pub async fn run(profile_arg: Option<String>, _no_ui: bool, stats: bool) -> Result<(), ExitError> {
    let config_path = Path::new(CONFIG_FILE);
    let (services, profiles) = fuku_config::load(config_path)
        .map_err(|e| ExitError::startup(format!("loading {CONFIG_FILE}: {e}")))?;

    let profile = select_profile(&profiles, profile_arg.as_deref())
        .map_err(|e| ExitError::startup(e.to_string()))?;

    let socket_path = paths::socket_path(&profile.name);
    let session = Arc::new(SessionTracker::new(paths::session_path()));
    let bus = EventBus::new();

    let hub_cancel = CancellationToken::new();
    let hub = Hub::spawn(hub_cancel.clone());

    let listener = fuku_daemon::bind(&socket_path)
        .await
        .map_err(|e| ExitError::startup(e.to_string()))?;
    let socket_cancel = CancellationToken::new();
    let accept_hub = hub.clone();
    let accept_cancel = socket_cancel.clone();
    tokio::spawn(async move { fuku_daemon::run(listener, accept_hub, accept_cancel).await });

    let formatter = Mutex::new(Formatter::new());
    let sink_hub = hub.clone();
    let log_sink: LogSink = Arc::new(move |service, _stream, line| {
        sink_hub.broadcast(service, line);
        println!("{}", formatter.lock().format(service, line));
    });

    let scheduler = Scheduler::new(bus.clone(), Arc::new(SystemClock), log_sink, session.clone());
    scheduler.set_stats_enabled(stats);
    if stats {
        spawn_stats_printer(bus.clone(), scheduler.cancellation());
    }

    let coordinator = Arc::new(ShutdownCoordinator::new(
        scheduler.clone(),
        session,
        socket_cancel,
        hub_cancel,
    ));

    spawn_signal_handler(coordinator.clone());

    let start_result = scheduler.start(services, profile).await;
    if let Err(e) = start_result {
        error!(error = %e, "startup failed");
        coordinator.trigger().await;
        return Err(ExitError::startup(e.to_string()));
    }
    info!("session running");

    let stdin_coordinator = coordinator.clone();
    let controller_scheduler = scheduler.clone();
    let controller_handle =
        tokio::spawn(async move { controller::run(controller_scheduler, stdin_coordinator).await });

    scheduler.cancellation().cancelled().await;
    coordinator.trigger().await;
    controller_handle.abort();

    Ok(())
}

fn select_profile(profiles: &[Profile], requested: Option<&str>) -> Result<Profile, ConfigError> {
    let name = requested.unwrap_or("default");
    profiles
        .iter()
        .find(|p| p.name == name)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
}

/// Prints one formatted line per `ServiceResources` event (`--stats`).
/// Every other event kind is ignored here; the log stream itself is
/// printed directly from the scheduler's `LogSink`, not through the bus.
fn spawn_stats_printer(bus: EventBus, scope: CancellationToken) {
    tokio::spawn(async move {
        let mut formatter = Formatter::new();
        let mut subscription = bus.subscribe(scope);
        while let Some(event) = subscription.recv().await {
            if let Event::ServiceResources { service, cpu_percent, resident_bytes } = event {
                let line = format!("cpu={cpu_percent:.1}% rss={}KiB", resident_bytes / 1024);
                println!("{}", formatter.format(&service, &line));
            }
        }
    });
}

fn spawn_signal_handler(coordinator: Arc<ShutdownCoordinator>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => error!(error = %e, "failed to install SIGTERM handler"),
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
        coordinator.trigger().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selecting_a_missing_profile_is_an_unknown_profile_error() {
        let profiles = vec![Profile { name: "default".to_string(), services: vec![], require_all_ready: true }];
        let result = select_profile(&profiles, Some("staging"));
        assert!(matches!(result, Err(ConfigError::UnknownProfile(name)) if name == "staging"));
    }

    #[test]
    fn no_profile_argument_selects_default() {
        let profiles = vec![Profile { name: "default".to_string(), services: vec![], require_all_ready: true }];
        let result = select_profile(&profiles, None).unwrap();
        assert_eq!(result.name, "default");
    }
}
