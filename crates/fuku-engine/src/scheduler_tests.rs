use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fuku_core::{Command, Event, EventBus, Profile, ReadinessProbe, ServiceDescriptor, ServiceState, SystemClock};
use fuku_storage::SessionTracker;
use tokio_util::sync::CancellationToken;

use super::*;

fn shell(name: &str, command: &str) -> ServiceDescriptor {
    ServiceDescriptor::builder()
        .name(name)
        .working_dir(PathBuf::from("."))
        .command(Command::Shell(command.to_string()))
        .build()
}

fn scheduler() -> (Scheduler, EventBus) {
    let bus = EventBus::new();
    let dir = tempfile::tempdir().unwrap();
    let session = Arc::new(SessionTracker::new(dir.path().join("session.json")));
    let sink: LogSink = Arc::new(|_, _, _| {});
    let scheduler = Scheduler::new(bus.clone(), Arc::new(SystemClock), sink, session);
    (scheduler, bus)
}

#[tokio::test]
async fn starting_a_profile_reaches_running_for_every_service() {
    let (scheduler, _bus) = scheduler();
    let services = vec![shell("web", "sleep 5"), shell("db", "sleep 5")];
    let profile = Profile { name: "default".to_string(), services: vec!["web".to_string(), "db".to_string()], require_all_ready: true };

    scheduler.start(services, profile).await.unwrap();

    assert_eq!(scheduler.service_state("web"), Some(ServiceState::Running));
    assert_eq!(scheduler.service_state("db"), Some(ServiceState::Running));
    assert_eq!(scheduler.phase(), fuku_core::Phase::Running);

    scheduler.stop_service("web").await;
    scheduler.stop_service("db").await;
}

#[tokio::test]
async fn a_dependent_service_starts_only_after_its_dependency() {
    let (scheduler, _bus) = scheduler();
    let db = shell("db", "sleep 5");
    let mut web = shell("web", "sleep 5");
    web.dependencies = vec!["db".to_string()];
    let profile = Profile { name: "default".to_string(), services: vec!["web".to_string(), "db".to_string()], require_all_ready: true };

    scheduler.start(vec![web, db], profile).await.unwrap();

    let tiers = scheduler.tiers();
    assert_eq!(tiers.len(), 2);
    assert_eq!(tiers[0].services, vec!["db".to_string()]);
    assert_eq!(tiers[1].services, vec!["web".to_string()]);
    assert_eq!(scheduler.service_state("web"), Some(ServiceState::Running));
    assert_eq!(scheduler.service_state("db"), Some(ServiceState::Running));

    scheduler.stop_service("web").await;
    scheduler.stop_service("db").await;
}

#[tokio::test]
async fn require_all_ready_stops_startup_on_an_early_failure() {
    let (scheduler, _bus) = scheduler();
    let services = vec![shell("broken", "exit 1")];
    let profile = Profile { name: "default".to_string(), services: vec!["broken".to_string()], require_all_ready: true };

    let result = scheduler.start(services, profile).await;
    assert!(result.is_err());
    assert!(scheduler.cancellation().is_cancelled());
}

#[tokio::test]
async fn an_optional_service_failure_does_not_cancel_startup() {
    let (scheduler, _bus) = scheduler();
    let mut broken = shell("broken", "exit 1");
    broken.optional = true;
    let services = vec![broken, shell("web", "sleep 5")];
    let profile =
        Profile { name: "default".to_string(), services: vec!["broken".to_string(), "web".to_string()], require_all_ready: true };

    scheduler.start(services, profile).await.unwrap();
    assert!(!scheduler.cancellation().is_cancelled());
    assert_eq!(scheduler.service_state("web"), Some(ServiceState::Running));

    scheduler.stop_service("web").await;
}

#[tokio::test]
async fn stop_service_is_recorded_as_graceful() {
    let (scheduler, bus) = scheduler();
    let services = vec![shell("web", "sleep 5")];
    let profile = Profile { name: "default".to_string(), services: vec!["web".to_string()], require_all_ready: true };
    scheduler.start(services, profile).await.unwrap();

    let mut sub = bus.subscribe(CancellationToken::new());
    scheduler.stop_service("web").await;

    let stopped = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match sub.recv().await {
                Some(event @ Event::ServiceStopped { .. }) => return event,
                Some(_) => continue,
                None => panic!("bus closed before ServiceStopped"),
            }
        }
    })
    .await
    .unwrap();

    match stopped {
        Event::ServiceStopped { graceful, .. } => assert!(graceful),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn a_never_policy_service_stays_stopped_after_exit() {
    let (scheduler, _bus) = scheduler();
    let mut flaky = shell("flaky", "exit 3");
    flaky.restart_policy = fuku_core::RestartPolicy::Never;
    let services = vec![flaky];
    let profile = Profile { name: "default".to_string(), services: vec!["flaky".to_string()], require_all_ready: false };

    // This service never becomes ready (it exits immediately), so startup
    // reports it as failed; require_all_ready is false so the session
    // still reaches Running.
    let _ = scheduler.start(services, profile).await;
}

#[tokio::test]
async fn starting_a_stopped_service_brings_it_back_to_running() {
    let (scheduler, _bus) = scheduler();
    let services = vec![shell("web", "sleep 5")];
    let profile = Profile { name: "default".to_string(), services: vec!["web".to_string()], require_all_ready: true };
    scheduler.start(services, profile).await.unwrap();

    scheduler.stop_service("web").await;
    assert_eq!(scheduler.service_state("web"), Some(ServiceState::Stopped));

    scheduler.start_service("web").await;
    assert_eq!(scheduler.service_state("web"), Some(ServiceState::Running));

    scheduler.stop_service("web").await;
}

#[tokio::test]
async fn a_delay_probe_still_times_out_against_a_shorter_configured_deadline() {
    // A Delay probe longer than the service's own deadline must still fail:
    // the deadline bounds every probe kind uniformly, with no special case
    // that lets Delay outrun it.
    let (scheduler, _bus) = scheduler();
    let mut web = shell("web", "sleep 5");
    web.readiness = Some(ReadinessProbe::Delay { duration_ms: 10_000 });
    web.readiness_deadline_secs = 1;
    let profile = Profile { name: "default".to_string(), services: vec!["web".to_string()], require_all_ready: true };

    let result = scheduler.start(vec![web], profile).await;
    assert!(result.is_err());
    assert_eq!(scheduler.service_state("web"), Some(ServiceState::Failed));
}

#[tokio::test]
async fn a_process_that_exits_before_its_probe_is_satisfied_fails_fast() {
    let (scheduler, bus) = scheduler();
    let mut broken = shell("broken", "exit 1");
    broken.readiness = Some(ReadinessProbe::Log { pattern: "this-never-appears".to_string() });
    broken.readiness_deadline_secs = 60;
    let profile = Profile { name: "default".to_string(), services: vec!["broken".to_string()], require_all_ready: true };

    let mut sub = bus.subscribe(CancellationToken::new());
    let result = tokio::time::timeout(Duration::from_secs(5), scheduler.start(vec![broken], profile)).await.unwrap();
    assert!(result.is_err());
    assert_eq!(scheduler.service_state("broken"), Some(ServiceState::Failed));

    let failed = loop {
        match sub.recv().await {
            Some(event @ Event::ServiceFailed { .. }) => break event,
            Some(_) => continue,
            None => panic!("bus closed before ServiceFailed"),
        }
    };
    match failed {
        Event::ServiceFailed { reason, .. } => assert_eq!(reason, "process exited before ready"),
        _ => unreachable!(),
    }
}
