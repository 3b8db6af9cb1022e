mod classifier;
mod cli;
mod dedup;
mod error;
mod extractor;
mod fmt;
mod mail;
mod models;
mod providers;
mod settings;
mod shutdown;
mod store;
mod tracker;

use std::path::Path;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

/// Stderr logging, plus a plain-text copy in `log_file` when given. The
/// returned guard flushes the file writer when dropped.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let Some(log_path) = log_file else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    };

    let dir = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;
    let file_name = log_path
        .file_name()
        .with_context(|| format!("{} is not a file path", log_path.display()))?;
    let (non_blocking, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();
    Ok(Some(guard))
}

fn main() {
    // A .env file in the working directory (or a parent) may carry the
    // mailbox settings; real environment variables take precedence.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let guard = match init_logging(cli.verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };

    match dotenv {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {e}"),
    }

    let Some(command) = cli.command else {
        // Help output only fails if stdout is gone.
        let _ = Cli::command().print_help();
        println!();
        return;
    };

    let result = match command {
        Commands::Monitor => cli::monitor::run(),
        Commands::Check => cli::check::run(),
        Commands::Stats => cli::stats::run(),
        Commands::Validate => cli::validate::run(),
        Commands::Init {
            email,
            ledger,
            interval,
            imap_server,
        } => cli::init::run(email, ledger, interval, imap_server),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        drop(guard);
        std::process::exit(1);
    }
}
