// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fuku-core: shared domain types for the `fuku` runner — the data model,
//! the event bus, and the cross-cutting error taxonomy.

pub mod macros;

pub mod bus;
pub mod clock;
pub mod error;
pub mod event;
pub mod id;
pub mod model;

pub use bus::{EventBus, Subscription};
pub use clock::{Clock, DynClock, FakeClock, SharedClock, SystemClock};
pub use error::{ConfigError, FailureKind, ProtocolError, SessionError};
pub use event::{Event, Phase};
pub use id::{short, IdBuf};
pub use model::{
    Command, LogEntry, Profile, ReadinessProbe, ResourceSample, RestartPolicy, ServiceDescriptor,
    ServiceState, Stream, Tier, DEFAULT_READINESS_DEADLINE, DEFAULT_SHUTDOWN_GRACE,
};
