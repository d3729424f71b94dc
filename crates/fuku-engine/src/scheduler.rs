//! The Scheduler: builds tiers, drives the Startup phase, and supervises
//! each service for the life of the session (readiness probing, restart
//! policy, and the state transitions the Interactive Controller proposes).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fuku_core::{Event, EventBus, Phase, Profile, ServiceDescriptor, ServiceState, SharedClock, Stream, Tier};
use fuku_process::{Handle, Sampler};
use fuku_readiness::{wait_until_ready, LogTail, Probe as _, ProbeContext};
use fuku_storage::{SessionEntry, SessionTracker};
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::controller::{self, ControlEvent, Effect};
use crate::error::StartupError;
use crate::graph::build_tiers;
use crate::restart::{self, Backoff};

/// Invoked once per captured output line, after it's been pushed into that
/// service's readiness log tail: `(service, stream, line)`. Callers wire
/// this to the Log Broadcast Hub.
pub type LogSink = Arc<dyn Fn(&str, Stream, &str) + Send + Sync>;

struct RuntimeEntry {
    descriptor: ServiceDescriptor,
    state: ServiceState,
    handle: Option<Arc<Handle>>,
    log_tail: LogTail,
    backoff: Backoff,
    /// Set just before `Handle::stop` is issued so the exit-monitor task
    /// knows this exit was deliberate and shouldn't trigger a respawn.
    stop_requested: bool,
}

struct Inner {
    bus: EventBus,
    clock: SharedClock,
    sink: LogSink,
    session: Arc<SessionTracker>,
    cancel: CancellationToken,
    phase: Mutex<Phase>,
    tiers: Mutex<Vec<Tier>>,
    runtime: Mutex<HashMap<String, RuntimeEntry>>,
    profile: Mutex<String>,
    /// Off by default: sampling only runs when something has asked for it
    /// (`fuku run --stats`), so a plain session never pays the `/proc` reads.
    stats_enabled: std::sync::atomic::AtomicBool,
}

/// Cloneable handle to one session's Scheduler.
#[derive(Clone)]
pub struct Scheduler(Arc<Inner>);

impl Scheduler {
    pub fn new(bus: EventBus, clock: SharedClock, sink: LogSink, session: Arc<SessionTracker>) -> Self {
        Self(Arc::new(Inner {
            bus,
            clock,
            sink,
            session,
            cancel: CancellationToken::new(),
            phase: Mutex::new(Phase::Discovery),
            tiers: Mutex::new(Vec::new()),
            runtime: Mutex::new(HashMap::new()),
            profile: Mutex::new(String::new()),
            stats_enabled: std::sync::atomic::AtomicBool::new(false),
        }))
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.0.cancel.clone()
    }

    /// Turns `ServiceResources` sampling on or off for every service
    /// started from this point on. Has no effect on services already past
    /// their `Running` transition when called.
    pub fn set_stats_enabled(&self, enabled: bool) {
        self.0.stats_enabled.store(enabled, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn phase(&self) -> Phase {
        *self.0.phase.lock()
    }

    pub fn tiers(&self) -> Vec<Tier> {
        self.0.tiers.lock().clone()
    }

    pub fn service_state(&self, name: &str) -> Option<ServiceState> {
        self.0.runtime.lock().get(name).map(|e| e.state)
    }

    /// Forces a phase transition and publishes `PhaseChanged`. `start`
    /// drives `Discovery`/`Startup`/`Running` itself; this is exposed so
    /// the Shutdown Coordinator can drive `Shutdown`/`Stopped`, the two
    /// phases it alone is responsible for.
    pub fn set_phase(&self, phase: Phase) {
        *self.0.phase.lock() = phase;
        self.0.bus.publish(Event::PhaseChanged { phase });
    }

    fn set_state(&self, service: &str, state: ServiceState) {
        if let Some(entry) = self.0.runtime.lock().get_mut(service) {
            entry.state = state;
        }
        self.0.bus.publish(Event::ServiceState { service: service.to_string(), state });
    }

    /// Resolves `services`/`profile` into tiers and starts every tier in
    /// order, publishing the phase and per-tier/per-service events from
    /// §4.7. Returns once the `Running` phase is reached (or an error if
    /// resolution failed, or `require_all_ready` was violated mid-startup).
    pub async fn start(&self, services: Vec<ServiceDescriptor>, profile: Profile) -> Result<(), StartupError> {
        *self.0.profile.lock() = profile.name.clone();
        self.0
            .bus
            .publish(Event::ProfileResolved { profile: profile.name.clone(), services: profile.services.clone() });

        let tiers = build_tiers(&services, &profile.services)?;
        *self.0.tiers.lock() = tiers.clone();

        let by_name: HashMap<String, ServiceDescriptor> =
            services.into_iter().map(|s| (s.name.clone(), s)).collect();
        {
            let mut runtime = self.0.runtime.lock();
            for name in &profile.services {
                let descriptor = by_name[name].clone();
                runtime.insert(
                    name.clone(),
                    RuntimeEntry {
                        descriptor,
                        state: ServiceState::Pending,
                        handle: None,
                        log_tail: LogTail::new(),
                        backoff: Backoff::default(),
                        stop_requested: false,
                    },
                );
            }
        }

        self.set_phase(Phase::Startup);
        for tier in &tiers {
            if self.start_tier(tier, profile.require_all_ready).await.is_err() {
                return Err(StartupError::RequireAllReadyViolation { tier: tier.name() });
            }
        }
        self.set_phase(Phase::Running);
        Ok(())
    }

    async fn start_tier(&self, tier: &Tier, require_all_ready: bool) -> Result<(), ()> {
        self.0.bus.publish(Event::TierStarting { tier: tier.name() });

        let mut set = JoinSet::new();
        for name in tier.services.clone() {
            let scheduler = self.clone();
            set.spawn(async move {
                let ok = scheduler.start_one(&name).await;
                (name, ok)
            });
        }
        let mut outcomes: HashMap<String, bool> = HashMap::new();
        while let Some(result) = set.join_next().await {
            if let Ok((name, ok)) = result {
                outcomes.insert(name, ok);
            }
        }

        let any_required_failure = tier.services.iter().any(|name| {
            let ok = outcomes.get(name).copied().unwrap_or(false);
            !ok && !self.0.runtime.lock()[name].descriptor.optional
        });

        if require_all_ready && any_required_failure {
            error!(tier = %tier.name(), "tier failed under require-all-ready, initiating shutdown");
            self.0.cancel.cancel();
            return Err(());
        }

        self.0.bus.publish(Event::TierReady { tier: tier.name() });
        Ok(())
    }

    async fn start_one(&self, name: &str) -> bool {
        let descriptor = self.0.runtime.lock()[name].descriptor.clone();
        let log_tail = self.0.runtime.lock()[name].log_tail.clone();

        match self.spawn_service(&descriptor, log_tail.clone()).await {
            Ok(handle) => {
                let pid = handle.pid();
                {
                    let mut runtime = self.0.runtime.lock();
                    if let Some(entry) = runtime.get_mut(name) {
                        entry.handle = Some(handle.clone());
                    }
                }
                self.set_state(name, ServiceState::Starting);
                self.0.bus.publish(Event::ServiceStarting {
                    service: name.to_string(),
                    pid,
                    started_at_ms: handle.started_at_ms(),
                });
                self.record_session_entry(name, pid);

                let ready = self.probe_ready(&descriptor, &log_tail, &handle).await;
                match ready {
                    Ok(()) => {
                        self.set_state(name, ServiceState::Ready);
                        self.0.bus.publish(Event::ServiceReady { service: name.to_string() });
                        self.set_state(name, ServiceState::Running);
                        self.spawn_resource_sampler(name.to_string(), pid);
                        self.spawn_exit_monitor(name.to_string(), handle);
                        true
                    }
                    Err(reason) => {
                        self.set_state(name, ServiceState::Failed);
                        self.0.bus.publish(Event::ServiceFailed { service: name.to_string(), reason: reason.clone() });
                        let _ = handle.stop(descriptor.shutdown_grace()).await;
                        false
                    }
                }
            }
            Err(reason) => {
                self.set_state(name, ServiceState::Failed);
                self.0.bus.publish(Event::ServiceFailed { service: name.to_string(), reason });
                false
            }
        }
    }

    async fn spawn_service(&self, descriptor: &ServiceDescriptor, log_tail: LogTail) -> Result<Arc<Handle>, String> {
        let sink = self.0.sink.clone();
        let service = descriptor.name.clone();
        let line_sink: fuku_process::LineSink = Arc::new(move |stream, line| {
            log_tail.push(line.clone());
            sink(&service, stream, &line);
        });
        fuku_process::spawn(descriptor, self.0.clock.epoch_ms(), line_sink)
            .map(Arc::new)
            .map_err(|e| e.to_string())
    }

    /// Races the configured probe against the child's own exit: a process
    /// that dies before satisfying its probe fails fast instead of running
    /// out the clock on a deadline it could never meet.
    async fn probe_ready(&self, descriptor: &ServiceDescriptor, log_tail: &LogTail, handle: &Handle) -> Result<(), String> {
        let Some(probe) = &descriptor.readiness else { return Ok(()) };
        let ctx = ProbeContext::new(descriptor.name.clone(), self.0.clock.clone(), log_tail.clone());
        let deadline = descriptor.readiness_deadline();
        tokio::select! {
            result = wait_until_ready(probe, &ctx, deadline) => result.map_err(|e| e.to_string()),
            _ = handle.wait() => Err("process exited before ready".to_string()),
        }
    }

    fn record_session_entry(&self, service: &str, pid: u32) {
        let profile = self.0.profile.lock().clone();
        let now = Utc::now();
        let entry = SessionEntry { service: service.to_string(), pid, started_at: now };
        if let Err(e) = self.0.session.add(&profile, now, entry) {
            warn!(service, error = %e, "failed to record session entry");
        }
    }

    /// Samples CPU%/RSS for `pid` once a second and publishes
    /// `ServiceResources`, until the service's own cancellation fires or
    /// `/proc/<pid>` disappears. No-op unless stats were enabled at the
    /// moment this service reached `Running`.
    fn spawn_resource_sampler(&self, name: String, pid: u32) {
        if !self.0.stats_enabled.load(std::sync::atomic::Ordering::Relaxed) {
            return;
        }
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut sampler = Sampler::new(pid);
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    _ = scheduler.0.cancel.cancelled() => return,
                }
                let Some(sample) = sampler.sample() else { return };
                scheduler.0.bus.publish(Event::ServiceResources {
                    service: name.clone(),
                    cpu_percent: sample.cpu_percent,
                    resident_bytes: sample.resident_bytes,
                });
            }
        });
    }

    /// Background task that owns a service's restart-policy loop while the
    /// session is alive: waits for the process to exit, decides whether to
    /// respawn, and otherwise marks the service terminal.
    fn spawn_exit_monitor(&self, name: String, handle: Arc<Handle>) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut handle = handle;
            loop {
                let exit = handle.wait().await;
                let stop_was_requested = {
                    let mut runtime = scheduler.0.runtime.lock();
                    let Some(entry) = runtime.get_mut(&name) else { return };
                    let requested = entry.stop_requested;
                    entry.stop_requested = false;
                    entry.handle = None;
                    requested
                };

                scheduler.0.bus.publish(Event::ServiceStopped {
                    service: name.clone(),
                    exit_code: exit.exit_code(),
                    graceful: stop_was_requested,
                });
                if let Err(e) = scheduler.0.session.remove(&name) {
                    debug!(service = %name, error = %e, "failed to remove session entry");
                }

                if stop_was_requested {
                    scheduler.set_state(&name, ServiceState::Stopped);
                    return;
                }

                let policy = scheduler.0.runtime.lock()[&name].descriptor.restart_policy;
                if !restart::should_respawn(policy, &exit) {
                    scheduler.set_state(
                        &name,
                        if exit.is_crash() { ServiceState::Failed } else { ServiceState::Stopped },
                    );
                    return;
                }

                let Some(delay) = scheduler.0.runtime.lock().get_mut(&name).map(|e| e.backoff.next_delay()) else {
                    return;
                };
                scheduler.set_state(&name, ServiceState::Restarting);
                info!(service = %name, delay_ms = delay.as_millis() as u64, "restarting after exit");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = scheduler.0.cancel.cancelled() => return,
                }

                let descriptor = scheduler.0.runtime.lock()[&name].descriptor.clone();
                let log_tail = scheduler.0.runtime.lock()[&name].log_tail.clone();
                match scheduler.spawn_service(&descriptor, log_tail.clone()).await {
                    Ok(new_handle) => {
                        let pid = new_handle.pid();
                        {
                            let mut runtime = scheduler.0.runtime.lock();
                            if let Some(entry) = runtime.get_mut(&name) {
                                entry.handle = Some(new_handle.clone());
                            }
                        }
                        scheduler.record_session_entry(&name, pid);
                        scheduler.0.bus.publish(Event::ServiceStarting {
                            service: name.clone(),
                            pid,
                            started_at_ms: new_handle.started_at_ms(),
                        });
                        scheduler.set_state(&name, ServiceState::Running);
                        scheduler.spawn_resource_sampler(name.clone(), pid);
                        handle = new_handle;
                    }
                    Err(reason) => {
                        scheduler.set_state(&name, ServiceState::Failed);
                        scheduler.0.bus.publish(Event::ServiceFailed { service: name.clone(), reason });
                        return;
                    }
                }
            }
        });
    }

    /// Issues a user-requested `Restart`: resets backoff unconditionally
    /// (manual intent overrides automatic policy) and stops the current
    /// process, letting its exit monitor respawn it immediately.
    /// Issues a user-requested `Start` on a stopped or failed service.
    /// No-op (logged at debug) if the service is already starting or
    /// running.
    pub async fn start_service(&self, name: &str) {
        let current_state = {
            let runtime = self.0.runtime.lock();
            let Some(entry) = runtime.get(name) else { return };
            entry.state
        };
        let Some(transition) = controller::apply(current_state, ControlEvent::Start) else {
            debug!(service = name, ?current_state, "start is a no-op in this state");
            return;
        };
        self.set_state(name, transition.to);
        self.respawn_now(name).await;
    }

    pub async fn restart_service(&self, name: &str) {
        let (current_state, handle) = {
            let mut runtime = self.0.runtime.lock();
            let Some(entry) = runtime.get_mut(name) else { return };
            entry.backoff.reset();
            (entry.state, entry.handle.clone())
        };
        let Some(transition) = controller::apply(current_state, ControlEvent::Restart) else {
            debug!(service = name, ?current_state, "restart is a no-op in this state");
            return;
        };
        self.set_state(name, transition.to);
        if matches!(transition.effect, Effect::StopThenStart) {
            if let Some(handle) = handle {
                let grace = self.0.runtime.lock()[name].descriptor.shutdown_grace();
                if let Some(entry) = self.0.runtime.lock().get_mut(name) {
                    entry.stop_requested = false;
                }
                let _ = handle.stop(grace).await;
                // The exit monitor attached to this handle observes the exit,
                // sees `stop_requested == false`, and respawns on its own.
            } else {
                self.respawn_now(name).await;
            }
        }
    }

    /// Spawns `name` directly (no existing process to stop first), probes
    /// readiness, and attaches a fresh exit monitor. Used by manual restarts
    /// of a currently-stopped or failed service; shares its spawn/probe
    /// sequence with the Startup-phase path in [`Self::start_one`].
    async fn respawn_now(&self, name: &str) {
        self.start_one(name).await;
    }

    /// Stops one service on user request (`Stop` intent): marks the exit as
    /// deliberate so the restart-policy monitor doesn't respawn it.
    pub async fn stop_service(&self, name: &str) {
        let (current_state, handle, grace) = {
            let runtime = self.0.runtime.lock();
            let Some(entry) = runtime.get(name) else { return };
            (entry.state, entry.handle.clone(), entry.descriptor.shutdown_grace())
        };
        let Some(transition) = controller::apply(current_state, ControlEvent::Stop) else {
            debug!(service = name, ?current_state, "stop is a no-op in this state");
            return;
        };
        if let Some(entry) = self.0.runtime.lock().get_mut(name) {
            entry.stop_requested = true;
        }
        self.set_state(name, transition.to);
        if let Some(handle) = handle {
            let _ = handle.stop(grace).await;
        }
    }

    /// Stops every still-running service in `tier`, concurrently, waiting
    /// for all of them before returning. Used by the Shutdown Coordinator
    /// to stop tiers in reverse order.
    pub async fn stop_tier(&self, tier: &Tier) {
        let mut set = JoinSet::new();
        for name in tier.services.clone() {
            let scheduler = self.clone();
            set.spawn(async move { scheduler.stop_service(&name).await });
        }
        while set.join_next().await.is_some() {}
    }

    pub fn session(&self) -> &SessionTracker {
        &self.0.session
    }

    pub fn bus(&self) -> &EventBus {
        &self.0.bus
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
