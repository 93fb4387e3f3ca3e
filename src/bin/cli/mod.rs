//! CLI Module Organization
//!
//! - args: CLI argument structures
//! - commands: command execution
//! - output: tables and verdict display

pub mod args;
pub mod commands;
pub mod output;

pub use args::*;
pub use commands::*;
