use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::StorageError;
use crate::models::{PaymentRecord, LEDGER_COLUMNS};

use super::RecordStore;

/// A CSV file with one header row and one row per payment. Rows are only
/// ever appended.
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn create(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut wtr = csv::Writer::from_path(&self.path)?;
        wtr.write_record(LEDGER_COLUMNS)?;
        wtr.flush()?;
        Ok(())
    }

    /// A missing or zero-byte file has no header yet.
    fn needs_header(&self) -> Result<bool, StorageError> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

/// Whether the last byte of a non-empty file is a newline.
fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

impl RecordStore for CsvLedger {
    fn ensure_ready(&mut self) -> Result<(), StorageError> {
        if self.needs_header()? {
            self.create()?;
            info!("Created new ledger: {}", self.path.display());
        }
        Ok(())
    }

    fn append(&mut self, record: &PaymentRecord) -> Result<(), StorageError> {
        self.ensure_ready()?;
        let mut file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        // A hand-edited ledger may end without a newline; keep the new row
        // off the previous line.
        if !ends_with_newline(&mut file)? {
            file.write_all(b"\n")?;
        }
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        wtr.write_record(record.to_row())?;
        wtr.flush()?;
        Ok(())
    }

    fn records(&self) -> Result<Vec<PaymentRecord>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        let mut records = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let row = result?;
            let fields: Vec<&str> = row.iter().collect();
            match PaymentRecord::from_row(i + 1, &fields) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable ledger row in {}: {e}", self.path.display()),
            }
        }
        Ok(records)
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn test_ledger() -> (tempfile::TempDir, CsvLedger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("payments.csv"));
        (dir, ledger)
    }

    fn record(amount: Decimal, payer: &str) -> PaymentRecord {
        PaymentRecord {
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            amount,
            provider: Provider::PayPal,
            payer_name: payer.to_string(),
            email_subject: "Jane Doe sent you $1,200.00, thanks".to_string(),
            processed_at: NaiveDate::from_ymd_opt(2025, 1, 15)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_ensure_ready_writes_header() {
        let (_dir, mut ledger) = test_ledger();
        ledger.ensure_ready().unwrap();
        let content = std::fs::read_to_string(ledger.location()).unwrap();
        assert_eq!(
            content.lines().next(),
            Some("Date,Amount,Source,Client Name,Email Subject,Processed Date")
        );
    }

    #[test]
    fn test_ensure_ready_is_idempotent() {
        let (_dir, mut ledger) = test_ledger();
        ledger.append(&record(Decimal::new(120000, 2), "Jane Doe")).unwrap();
        ledger.ensure_ready().unwrap();
        assert_eq!(ledger.records().unwrap().len(), 1);
    }

    #[test]
    fn test_ensure_ready_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = CsvLedger::new(dir.path().join("deep").join("nested").join("p.csv"));
        ledger.ensure_ready().unwrap();
        assert!(ledger.location().exists());
    }

    #[test]
    fn test_append_and_read_back() {
        let (_dir, mut ledger) = test_ledger();
        let original = record(Decimal::new(120000, 2), "Jane Doe");
        ledger.append(&original).unwrap();
        let records = ledger.records().unwrap();
        assert_eq!(records, vec![original]);
        let content = std::fs::read_to_string(ledger.location()).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let (_dir, ledger) = test_ledger();
        assert!(ledger.records().unwrap().is_empty());
        assert_eq!(ledger.summary_statistics().unwrap().count, 0);
    }

    #[test]
    fn test_exists_matching() {
        let (_dir, mut ledger) = test_ledger();
        let r = record(Decimal::new(120000, 2), "Jane Doe");
        ledger.append(&r).unwrap();
        assert!(ledger
            .exists_matching(r.date, Decimal::new(12000, 1), Provider::PayPal, "Jane Doe")
            .unwrap());
        assert!(!ledger
            .exists_matching(r.date, r.amount, Provider::PayPal, "John Doe")
            .unwrap());
    }

    #[test]
    fn test_empty_file_gets_header_before_first_row() {
        let (_dir, mut ledger) = test_ledger();
        std::fs::write(ledger.location(), "").unwrap();
        let r = record(Decimal::new(7500, 2), "John Smith");
        ledger.append(&r).unwrap();

        let content = std::fs::read_to_string(ledger.location()).unwrap();
        assert!(content.starts_with("Date,Amount,Source"));
        assert_eq!(ledger.records().unwrap(), vec![r.clone()]);
        assert!(ledger
            .exists_matching(r.date, r.amount, r.provider, &r.payer_name)
            .unwrap());
    }

    #[test]
    fn test_header_without_trailing_newline() {
        let (_dir, mut ledger) = test_ledger();
        std::fs::write(ledger.location(), LEDGER_COLUMNS.join(",")).unwrap();
        ledger.append(&record(Decimal::new(7500, 2), "John Smith")).unwrap();
        ledger.append(&record(Decimal::new(2000, 2), "Jane Doe")).unwrap();

        let content = std::fs::read_to_string(ledger.location()).unwrap();
        assert_eq!(content.lines().count(), 3);
        let records = ledger.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].payer_name, "John Smith");
    }

    #[test]
    fn test_corrupt_rows_are_skipped() {
        let (_dir, mut ledger) = test_ledger();
        ledger.append(&record(Decimal::new(5000, 2), "A B")).unwrap();
        let mut content = std::fs::read_to_string(ledger.location()).unwrap();
        content.push_str("yesterday,lots,Zelle,X Y,subj,now\n");
        std::fs::write(ledger.location(), content).unwrap();
        ledger.append(&record(Decimal::new(6000, 2), "C D")).unwrap();
        let records = ledger.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].payer_name, "C D");
    }
}
