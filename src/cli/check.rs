use colored::Colorize;

use crate::error::{PennyError, Result};
use crate::settings::load_config;
use crate::shutdown::{install_ctrlc_handler, Shutdown};
use crate::store::RecordStore;

use super::build_tracker;

pub fn run() -> Result<()> {
    let config = load_config()?;
    let shutdown = Shutdown::new();
    install_ctrlc_handler(&shutdown)
        .map_err(|e| PennyError::Other(format!("Could not install Ctrl+C handler: {e}")))?;

    let mut tracker = build_tracker(config)?;
    tracker.verify()?;
    let report = tracker.run_single_check(&shutdown)?;

    println!("Ledger:             {}", tracker.store().location().display());
    println!("New records:        {}", report.records_processed.to_string().green().bold());
    println!("Messages examined:  {}", report.messages_examined);
    println!("Duplicates skipped: {}", report.duplicates);
    println!("Total handled:      {}", report.total_handled);
    println!("Duration:           {:.2}s", report.duration.as_secs_f64());
    if report.pending_writes > 0 {
        println!(
            "{}",
            format!("{} payment(s) could not be written to the ledger", report.pending_writes).red()
        );
    }
    if !report.failed_senders.is_empty() {
        println!("{}", "Failed senders:".yellow());
        for sender in &report.failed_senders {
            println!("  {sender}");
        }
    }
    if report.interrupted {
        println!("{}", "Check interrupted before completion.".yellow());
    }
    Ok(())
}
