//! The Interactive Controller: translates user intents into state
//! transitions and the supervisor action each one implies. Implemented as
//! a plain transition table — a finite-state-machine crate would be
//! overkill for nine states and six events.

use fuku_core::ServiceState;

/// A user- or system-originated intent directed at one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Start,
    Started,
    Stop,
    Stopped,
    Failed,
    Restart,
}

/// What the Scheduler must do in response to a transition, beyond updating
/// the recorded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    ScheduleSpawn,
    SupervisorStop,
    /// Stop the running process first (if alive), then schedule a spawn.
    StopThenStart,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub to: ServiceState,
    pub effect: Effect,
}

/// Applies `event` to `from`. Returns `None` for an illegal transition —
/// callers should log that at `debug!` and otherwise ignore it.
pub fn apply(from: ServiceState, event: ControlEvent) -> Option<Transition> {
    use ControlEvent::*;
    use ServiceState::*;

    match (from, event) {
        (Stopped | Failed, Start) => Some(Transition { to: Starting, effect: Effect::ScheduleSpawn }),
        (Starting, Started) => Some(Transition { to: Running, effect: Effect::None }),
        (Running | Ready, Stop) => Some(Transition { to: Stopping, effect: Effect::SupervisorStop }),
        (Stopping, Stopped) => Some(Transition { to: Stopped, effect: Effect::None }),
        (Starting | Initializing | Ready | Running | Stopping, Failed) => {
            Some(Transition { to: ServiceState::Failed, effect: Effect::None })
        }
        (Running | Stopped | Failed, Restart) => {
            Some(Transition { to: Restarting, effect: Effect::StopThenStart })
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
