use std::path::PathBuf;

use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path, shellexpand_path};
use crate::store::{Ledger, RecordStore};

pub fn run(
    email: Option<String>,
    ledger: Option<String>,
    interval: Option<u64>,
    imap_server: Option<String>,
) -> Result<()> {
    let mut settings = load_settings();
    if let Some(email) = email {
        settings.email_address = email;
    }
    if let Some(ledger) = ledger {
        settings.ledger_path = ledger;
    }
    if let Some(interval) = interval {
        settings.check_interval = interval;
    }
    if let Some(server) = imap_server {
        settings.imap_server = server;
    }
    save_settings(&settings)?;

    let ledger_path = PathBuf::from(shellexpand_path(&settings.ledger_path));
    let mut ledger = Ledger::open(&ledger_path)?;
    ledger.ensure_ready()?;

    println!("Settings written to {}", settings_path().display());
    println!("Ledger ready at {} ({})", ledger_path.display(), ledger.kind());
    println!();
    println!("Set EMAIL_PASSWORD in the environment (an app password for Gmail),");
    println!("then run `penny validate` followed by `penny monitor`.");
    Ok(())
}
