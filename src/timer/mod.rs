//! Pure timer core.
//!
//! - [`TimerMachine`]: the state machine operations
//! - [`rehydrate`]: start-up reconciliation against wall-clock time
//! - [`Presentation`]: hints derived from the current state
//! - [`Effect`]: requests for the collaborator layer
//!
//! Nothing in this module performs I/O or reads the clock; callers pass
//! `now_ms` (epoch milliseconds) explicitly.

pub mod effect;
pub mod machine;
pub mod presentation;
pub mod rehydrate;

pub use effect::{Chime, CompletedSession, Effect, LoopSound, Notice, NOTIFICATION_TITLE};
pub use machine::TimerMachine;
pub use presentation::{Presentation, StatusHint};
pub use rehydrate::rehydrate;
