use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::money;
use crate::models::Provider;
use crate::settings::load_ledger_path;
use crate::store::{Ledger, RecordStore};

fn or_dash(value: Option<rust_decimal::Decimal>) -> String {
    value.map(money).unwrap_or_else(|| "-".to_string())
}

pub fn run() -> Result<()> {
    let ledger = Ledger::open(&load_ledger_path())?;
    let stats = ledger.summary_statistics()?;

    println!("Ledger:   {} ({})", ledger.location().display(), ledger.kind());
    println!();

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Total payments"), Cell::new(stats.count)]);
    table.add_row(vec![Cell::new("Total amount".bold()), Cell::new(money(stats.total))]);
    table.add_row(vec![Cell::new("Average"), Cell::new(or_dash(stats.mean))]);
    table.add_row(vec![Cell::new("Largest"), Cell::new(or_dash(stats.max))]);
    table.add_row(vec![Cell::new("Smallest"), Cell::new(or_dash(stats.min))]);
    table.add_row(vec![Cell::new("Unique payers"), Cell::new(stats.unique_payers)]);
    println!("Summary\n{table}");

    let mut by_provider = Table::new();
    by_provider.set_header(vec!["Source", "Payments"]);
    for provider in Provider::ALL {
        let count = stats.by_provider.get(&provider).copied().unwrap_or(0);
        by_provider.add_row(vec![Cell::new(provider.name()), Cell::new(count)]);
    }
    println!("By source\n{by_provider}");

    if stats.count == 0 {
        println!("{}", "No payments recorded yet.".dimmed());
    }
    Ok(())
}
