//! Reveal engine
//!
//! The timed state machine behind a joke reveal: summoning, setup line,
//! suspense, punchline, and back to idle.
//!
//! # Architecture
//!
//! - [`Phase`]: the five steps and which of them advance on a timer
//! - [`RevealTimings`]: delays between steps
//! - [`RevealStateMachine`]: owns phase and joke, runs and cancels timers

pub mod machine;
pub mod phase;
pub mod timing;

pub use machine::{CycleId, FETCH_FAILED_NOTICE, RevealNotice, RevealSnapshot, RevealStateMachine};
pub use phase::Phase;
pub use timing::RevealTimings;
