use colored::Colorize;

use crate::error::{PennyError, Result};
use crate::mail::imap_mailbox::ImapMailbox;
use crate::mail::MailSource;
use crate::providers;
use crate::settings::{load_config, load_ledger_path};
use crate::store::{Ledger, RecordStore};

fn report(label: &str, outcome: std::result::Result<String, String>, failures: &mut usize) {
    match outcome {
        Ok(detail) => println!("{} {label}: {detail}", "PASS".green().bold()),
        Err(detail) => {
            *failures += 1;
            println!("{} {label}: {detail}", "FAIL".red().bold());
        }
    }
}

pub fn run() -> Result<()> {
    let mut failures = 0;

    match load_config() {
        Ok(config) => {
            report("Configuration", Ok("all settings valid".to_string()), &mut failures);
            let mut mailbox =
                ImapMailbox::new(&config.imap_server, config.imap_port, config.credentials);
            let probe = mailbox
                .verify()
                .map(|_| format!("connected to {}", config.imap_server))
                .map_err(|e| e.to_string());
            report("Mailbox", probe, &mut failures);
        }
        Err(e) => {
            report("Configuration", Err(e.to_string()), &mut failures);
            report("Mailbox", Err("skipped, configuration invalid".to_string()), &mut failures);
        }
    }

    let ledger_path = load_ledger_path();
    let ledger = Ledger::open(&ledger_path).and_then(|mut ledger| {
        ledger.ensure_ready()?;
        Ok(ledger)
    });
    let access = ledger
        .map(|l| format!("{} ({})", l.location().display(), l.kind()))
        .map_err(|e| format!("{}: {e}", ledger_path.display()));
    report("Ledger", access, &mut failures);

    let count = providers::patterns().len();
    let table = if count > 0 {
        Ok(format!("{count} providers loaded"))
    } else {
        Err("no provider patterns".to_string())
    };
    report("Provider patterns", table, &mut failures);

    println!();
    println!("Monitored senders:");
    for address in providers::all_sender_addresses() {
        println!("  {address}");
    }

    if failures > 0 {
        return Err(PennyError::Other(format!("{failures} validation check(s) failed")));
    }
    println!();
    println!("{}", "All checks passed.".green());
    Ok(())
}
