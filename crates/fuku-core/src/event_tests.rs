use super::*;
use crate::model::{ServiceState as SvcState, Stream};

#[test]
fn names_match_wire_tags() {
    let e = Event::ServiceReady { service: "api".into() };
    assert_eq!(e.name(), "service:ready");
    let json = serde_json::to_value(&e).unwrap();
    assert_eq!(json["type"], "service:ready");
}

#[test]
fn log_summary_is_non_empty_for_every_kind() {
    let events = vec![
        Event::ProfileResolved { profile: "default".into(), services: vec!["a".into()] },
        Event::PhaseChanged { phase: Phase::Startup },
        Event::TierStarting { tier: "t0".into() },
        Event::TierReady { tier: "t0".into() },
        Event::ServiceStarting { service: "a".into(), pid: 123, started_at_ms: 0 },
        Event::ServiceReady { service: "a".into() },
        Event::ServiceFailed { service: "a".into(), reason: "boom".into() },
        Event::ServiceStopped { service: "a".into(), exit_code: Some(0), graceful: true },
        Event::ServiceState { service: "a".into(), state: SvcState::Running },
        Event::LogLine { service: "a".into(), stream: Stream::Stdout, line: "hi".into() },
        Event::ServiceResources { service: "a".into(), cpu_percent: 12.5, resident_bytes: 1024 },
        Event::SignalCaught,
    ];
    for e in events {
        assert!(!e.log_summary().is_empty());
        assert!(!e.name().is_empty());
    }
}

#[test]
fn round_trips_through_json() {
    let e = Event::LogLine { service: "db".into(), stream: Stream::Stderr, line: "oops".into() };
    let json = serde_json::to_string(&e).unwrap();
    let back: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(e, back);
}
