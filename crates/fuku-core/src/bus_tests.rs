use super::*;
use crate::event::Phase;

fn phase_event(phase: Phase) -> Event {
    Event::PhaseChanged { phase }
}

#[tokio::test]
async fn subscriber_receives_events_in_publish_order() {
    let bus = EventBus::new();
    let scope = CancellationToken::new();
    let mut sub = bus.subscribe(scope);

    bus.publish(phase_event(Phase::Discovery));
    bus.publish(phase_event(Phase::Startup));

    assert_eq!(sub.recv().await, Some(phase_event(Phase::Discovery)));
    assert_eq!(sub.recv().await, Some(phase_event(Phase::Startup)));
}

#[tokio::test]
async fn late_subscriber_does_not_see_earlier_events() {
    let bus = EventBus::new();
    bus.publish(phase_event(Phase::Discovery));

    let scope = CancellationToken::new();
    let mut sub = bus.subscribe(scope);
    bus.publish(phase_event(Phase::Startup));

    assert_eq!(sub.recv().await, Some(phase_event(Phase::Startup)));
}

#[tokio::test]
async fn overflow_drops_oldest_and_counts() {
    let bus = EventBus::new();
    let scope = CancellationToken::new();
    let mut sub = bus.subscribe_with_capacity(scope, 2);

    bus.publish(phase_event(Phase::Discovery));
    bus.publish(phase_event(Phase::Startup));
    bus.publish(phase_event(Phase::Running));

    // Discovery was the oldest and should have been dropped.
    assert_eq!(sub.recv().await, Some(phase_event(Phase::Startup)));
    assert_eq!(sub.recv().await, Some(phase_event(Phase::Running)));
    assert_eq!(sub.dropped_count(), 1);
}

#[tokio::test]
async fn cancelling_scope_ends_the_stream() {
    let bus = EventBus::new();
    let scope = CancellationToken::new();
    let mut sub = bus.subscribe(scope.clone());
    scope.cancel();
    assert_eq!(sub.recv().await, None);
}

#[tokio::test]
async fn closing_bus_ends_every_subscription() {
    let bus = EventBus::new();
    let mut sub_a = bus.subscribe(CancellationToken::new());
    let mut sub_b = bus.subscribe(CancellationToken::new());
    bus.close();
    assert_eq!(sub_a.recv().await, None);
    assert_eq!(sub_b.recv().await, None);
}

#[tokio::test]
async fn dropping_subscription_unregisters_it() {
    let bus = EventBus::new();
    {
        let _sub = bus.subscribe(CancellationToken::new());
        assert_eq!(bus.subscriber_count(), 1);
    }
    assert_eq!(bus.subscriber_count(), 0);
}

#[tokio::test]
async fn publish_never_blocks_a_full_subscriber() {
    let bus = EventBus::new();
    let scope = CancellationToken::new();
    let _sub = bus.subscribe_with_capacity(scope, 1);
    for _ in 0..1000 {
        bus.publish(phase_event(Phase::Running));
    }
}
