pub mod engine;
pub mod states;

pub use engine::{BookingLifecycle, LifecycleError};
pub use states::{BookingEvent, LifecycleAction, TransitionOutcome};
