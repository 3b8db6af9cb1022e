use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::StorageError;
use crate::models::{PaymentRecord, Provider, DATE_FORMAT};

use super::RecordStore;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS payments (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    amount TEXT NOT NULL,
    source TEXT NOT NULL,
    client_name TEXT NOT NULL,
    email_subject TEXT NOT NULL,
    processed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_payments_key ON payments (date, source, client_name);
";

/// SQLite-backed ledger. Amounts are stored as decimal text, never REAL.
pub struct SqliteLedger {
    path: PathBuf,
    conn: Connection,
}

pub fn get_connection(db_path: &Path) -> Result<Connection, StorageError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

impl SqliteLedger {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = get_connection(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }
}

impl RecordStore for SqliteLedger {
    fn ensure_ready(&mut self) -> Result<(), StorageError> {
        init_db(&self.conn)
    }

    fn append(&mut self, record: &PaymentRecord) -> Result<(), StorageError> {
        init_db(&self.conn)?;
        let [date, amount, source, client_name, email_subject, processed_at] = record.to_row();
        self.conn.execute(
            "INSERT INTO payments (date, amount, source, client_name, email_subject, processed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![date, amount, source, client_name, email_subject, processed_at],
        )?;
        Ok(())
    }

    fn records(&self) -> Result<Vec<PaymentRecord>, StorageError> {
        init_db(&self.conn)?;
        let mut stmt = self.conn.prepare(
            "SELECT date, amount, source, client_name, email_subject, processed_at \
             FROM payments ORDER BY id",
        )?;
        let rows: Vec<[String; 6]> = stmt
            .query_map([], |row| {
                Ok([
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ])
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (i, fields) in rows.iter().enumerate() {
            match PaymentRecord::from_row(i + 1, fields) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable ledger row in {}: {e}", self.path.display()),
            }
        }
        Ok(records)
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn exists_matching(
        &self,
        date: NaiveDate,
        amount: Decimal,
        provider: Provider,
        payer_name: &str,
    ) -> Result<bool, StorageError> {
        init_db(&self.conn)?;
        let mut stmt = self.conn.prepare_cached(
            "SELECT amount FROM payments WHERE date = ?1 AND source = ?2 AND client_name = ?3",
        )?;
        let amounts: Vec<String> = stmt
            .query_map(
                rusqlite::params![date.format(DATE_FORMAT).to_string(), provider.name(), payer_name],
                |row| row.get(0),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        // Compared as decimals so "75.0" and "75.00" are the same payment.
        Ok(amounts
            .iter()
            .filter_map(|a| Decimal::from_str(a).ok())
            .any(|a| a == amount))
    }
}
