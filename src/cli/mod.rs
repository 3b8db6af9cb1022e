pub mod check;
pub mod init;
pub mod monitor;
pub mod stats;
pub mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::mail::imap_mailbox::ImapMailbox;
use crate::settings::Config;
use crate::store::Ledger;
use crate::tracker::Tracker;

#[derive(Parser)]
#[command(
    name = "penny",
    version,
    about = "Records Zelle, Venmo, Cash App and PayPal payments from your inbox into a ledger."
)]
pub struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Also write logs to this file
    #[arg(long = "log-file", global = true)]
    pub log_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the inbox until Ctrl+C.
    Monitor,
    /// Run one check cycle and exit.
    Check,
    /// Show summary statistics for the ledger.
    Stats,
    /// Check configuration, mailbox access and the ledger.
    Validate,
    /// Write the settings file and create the ledger.
    Init {
        /// Mailbox address to watch
        #[arg(long)]
        email: Option<String>,
        /// Ledger file; .db or .sqlite selects SQLite, anything else CSV
        #[arg(long)]
        ledger: Option<String>,
        /// Seconds between checks
        #[arg(long)]
        interval: Option<u64>,
        /// IMAP server hostname
        #[arg(long = "imap-server")]
        imap_server: Option<String>,
    },
}

/// Wire the IMAP mailbox and the configured ledger into a tracker.
pub(crate) fn build_tracker(config: Config) -> Result<Tracker<ImapMailbox, Ledger>> {
    let ledger = Ledger::open(&config.ledger_path)?;
    let mailbox = ImapMailbox::new(&config.imap_server, config.imap_port, config.credentials);
    Ok(Tracker::new(mailbox, ledger, config.check_interval))
}
