use colored::Colorize;

use crate::error::{PennyError, Result};
use crate::providers;
use crate::settings::load_config;
use crate::shutdown::{install_ctrlc_handler, Shutdown};

use super::build_tracker;

pub fn run() -> Result<()> {
    let config = load_config()?;

    println!("{}", "Penny payment monitor".bold());
    println!("Email:      {}", config.credentials.email_address);
    println!("IMAP:       {}:{}", config.imap_server, config.imap_port);
    println!("Ledger:     {}", config.ledger_path.display());
    println!("Interval:   {}s", config.check_interval.as_secs());
    println!("Senders:    {}", providers::all_sender_addresses().len());
    println!();
    println!("Press Ctrl+C to stop.");

    let shutdown = Shutdown::new();
    install_ctrlc_handler(&shutdown)
        .map_err(|e| PennyError::Other(format!("Could not install Ctrl+C handler: {e}")))?;

    let mut tracker = build_tracker(config)?;
    tracker.verify()?;
    tracker.run_continuous(&shutdown);
    println!("Monitoring stopped.");
    Ok(())
}
