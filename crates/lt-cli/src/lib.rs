//! Labor tracker CLI library.
//!
//! This crate provides the CLI interface for the labor tracker.

mod cli;
pub mod commands;
mod config;
mod session;

pub use cli::{Cli, Commands, EditArgs, NotesAction};
pub use config::Config;
pub use session::Session;
