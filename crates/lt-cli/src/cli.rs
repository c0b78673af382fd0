//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Contraction timer and log.
///
/// Times contractions, keeps a history with intensity ratings and notes, and
/// moves data between devices via backup files or share links.
#[derive(Debug, Parser)]
#[command(name = "lt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Time a contraction live. Press Enter to stop.
    Timer {
        /// Intensity rating (1-5) to record; prompts when omitted.
        #[arg(short, long)]
        intensity: Option<i64>,
    },

    /// Record a contraction after the fact.
    Add {
        /// Start time: ISO 8601, local `YYYY-MM-DD HH:MM[:SS]`, `HH:MM[:SS]` today, or 'N minutes ago'.
        #[arg(long)]
        at: String,

        /// Duration in seconds (90) or minutes:seconds (1:30).
        #[arg(short, long)]
        duration: String,

        /// Intensity rating (1-5). Defaults to 3.
        #[arg(short, long)]
        intensity: Option<i64>,
    },

    /// Edit a recorded contraction.
    Edit(EditArgs),

    /// Delete a recorded contraction.
    Delete {
        /// Entry number as shown by `lt history`.
        number: usize,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete all contractions and notes.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the latest duration and spacing.
    Status,

    /// Show recent contractions, newest first.
    History {
        /// Number of entries to show (defaults to the configured limit).
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the duration/interval series for charting.
    Chart {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show or change the notes.
    #[command(subcommand)]
    Notes(NotesAction),

    /// Write a JSON backup file.
    Export {
        /// Output file or directory (defaults to the current directory).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all data with a JSON backup file.
    Import {
        /// Backup file to read.
        file: PathBuf,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Print a share link carrying all data (suitable for a QR code).
    Share,

    /// Import data carried by a share link.
    OpenUrl {
        /// The share link.
        url: String,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Import data from a QR decoder's output.
    Scan {
        /// Decoder command printing one decoded code per line (e.g. "zbarcam --raw").
        #[arg(long, default_value = "zbarcam --raw --oneshot")]
        decoder: String,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for `lt edit`.
#[derive(Debug, Args)]
#[command(group(clap::ArgGroup::new("change").required(true).multiple(true)))]
pub struct EditArgs {
    /// Entry number as shown by `lt history`.
    pub number: usize,

    /// New start time; the duration is kept.
    #[arg(long, group = "change")]
    pub start: Option<String>,

    /// New duration in seconds (90) or minutes:seconds (1:30).
    #[arg(short, long, group = "change")]
    pub duration: Option<String>,

    /// New intensity rating (1-5).
    #[arg(short, long, group = "change")]
    pub intensity: Option<i64>,
}

/// Notes subcommands.
#[derive(Debug, Subcommand)]
pub enum NotesAction {
    /// Print the notes.
    Show,
    /// Replace the notes.
    Set {
        /// New notes text.
        text: String,
    },
    /// Append a line to the notes.
    Append {
        /// Line to append.
        text: String,
    },
}
