//! Tooling & Integration Layer
//!
//! Command-line front end over [`crate::sync::SyncEngine`] and [`crate::scheduler::Scheduler`].

pub mod cli;

pub use cli::{Cli, CliContext, CommandOutcome, Commands, MirrorArgs, OutputFormat};
