use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lt_cli::commands::{
    add, chart, clear, delete, edit, export, history, import, notes, open_url, scan, share, status,
    timer,
};
use lt_cli::{Cli, Commands, Config, Session};

/// Load config and open the store.
fn open_session(config_path: Option<&Path>) -> Result<Session> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Session::open(config)
}

/// Current-thread runtime for the commands that wait on input or a child process.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

async fn ctrl_c() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut session = open_session(cli.config.as_deref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let stdin = io::stdin();
    let now = Utc::now();

    match command {
        Commands::Timer { intensity } => {
            let rt = runtime()?;
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            let result = rt.block_on(timer::run(input, &mut out, &mut session, *intensity, ctrl_c()));
            // Stdin reads run on a blocking thread that may never return.
            rt.shutdown_background();
            result?;
        }
        Commands::Add {
            at,
            duration,
            intensity,
        } => add::run(&mut out, &mut session, at, duration, *intensity, now)?,
        Commands::Edit(args) => edit::run(&mut out, &mut session, args, now)?,
        Commands::Delete { number, yes } => {
            delete::run(&mut stdin.lock(), &mut out, &mut session, *number, *yes)?;
        }
        Commands::Clear { yes } => clear::run(&mut stdin.lock(), &mut out, &mut session, *yes)?,
        Commands::Status => status::run(&mut out, &session, now)?,
        Commands::History { limit, json } => history::run(&mut out, &session, *limit, *json)?,
        Commands::Chart { json } => chart::run(&mut out, &session, *json)?,
        Commands::Notes(action) => notes::run(&mut out, &mut session, action)?,
        Commands::Export { output } => {
            export::run(&mut out, &session, output.as_deref(), now)?;
        }
        Commands::Import { file, yes } => {
            import::run(&mut stdin.lock(), &mut out, &mut session, file, *yes)?;
        }
        Commands::Share => {
            share::run(&mut out, &session, now)?;
        }
        Commands::OpenUrl { url, yes } => {
            open_url::run(&mut stdin.lock(), &mut out, &mut session, url, *yes)?;
        }
        Commands::Scan { decoder, yes } => {
            let rt = runtime()?;
            let snapshot = rt.block_on(scan::read_snapshot(&mut out, decoder, ctrl_c()));
            drop(rt);
            import::apply(&mut stdin.lock(), &mut out, &mut session, snapshot?, *yes)?;
        }
    }

    out.flush()?;
    session.finish()
}
