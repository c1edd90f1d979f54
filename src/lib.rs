//! `punchline` - terminal joke teller with a dramatic, timed reveal
//!
//! A joke is fetched from a remote API and revealed in steps: a summoning
//! pause, the setup line, a suspense beat, and finally the punchline. The
//! pacing lives in [`reveal::RevealStateMachine`]; everything else is a
//! thin shell around it.

pub mod cli;
pub mod config;
pub mod error;
pub mod joke;
pub mod observability;
pub mod reveal;
pub mod view;
