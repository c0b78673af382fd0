//! CLI subcommand implementations.

pub mod add;
pub mod chart;
pub mod clear;
pub mod delete;
pub mod edit;
pub mod export;
pub mod history;
pub mod import;
pub mod notes;
pub mod open_url;
pub mod scan;
pub mod share;
pub mod status;
pub mod timer;
pub mod util;
