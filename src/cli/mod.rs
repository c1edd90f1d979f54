//! CLI module
//!
//! Command-line argument parsing and command dispatch for `punchline`.

pub mod args;
pub mod commands;
