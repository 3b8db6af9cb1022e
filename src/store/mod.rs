pub mod csv_ledger;
#[cfg(feature = "sqlite")]
pub mod sqlite_ledger;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::StorageError;
use crate::models::{PaymentRecord, Provider};

use csv_ledger::CsvLedger;
#[cfg(feature = "sqlite")]
use sqlite_ledger::SqliteLedger;

/// Append-only payment ledger.
pub trait RecordStore {
    /// Create the ledger (with its header/schema) if it does not exist yet.
    fn ensure_ready(&mut self) -> Result<(), StorageError>;

    fn append(&mut self, record: &PaymentRecord) -> Result<(), StorageError>;

    /// Every readable record, oldest first.
    fn records(&self) -> Result<Vec<PaymentRecord>, StorageError>;

    fn location(&self) -> &Path;

    fn exists_matching(
        &self,
        date: NaiveDate,
        amount: Decimal,
        provider: Provider,
        payer_name: &str,
    ) -> Result<bool, StorageError> {
        Ok(self
            .records()?
            .iter()
            .any(|r| r.matches(date, amount, provider, payer_name)))
    }

    fn summary_statistics(&self) -> Result<SummaryStats, StorageError> {
        SummaryStats::from_records(&self.records()?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SummaryStats {
    pub count: usize,
    pub total: Decimal,
    /// Rounded to cents. `None` on an empty ledger, as are `max` and `min`.
    pub mean: Option<Decimal>,
    pub max: Option<Decimal>,
    pub min: Option<Decimal>,
    pub unique_payers: usize,
    pub by_provider: BTreeMap<Provider, usize>,
}

impl SummaryStats {
    /// Fails only if the running total leaves the `Decimal` range.
    pub fn from_records(records: &[PaymentRecord]) -> Result<Self, StorageError> {
        let count = records.len();
        let mut total = Decimal::ZERO;
        for (i, r) in records.iter().enumerate() {
            total = total
                .checked_add(r.amount)
                .ok_or(StorageError::TotalOverflow {
                    row: i + 1,
                    amount: r.amount,
                })?;
        }
        let mean = (count > 0).then(|| (total / Decimal::from(count)).round_dp(2));
        let max = records.iter().map(|r| r.amount).max();
        let min = records.iter().map(|r| r.amount).min();
        let unique_payers = records
            .iter()
            .map(|r| r.payer_name.as_str())
            .collect::<HashSet<_>>()
            .len();
        let mut by_provider = BTreeMap::new();
        for r in records {
            *by_provider.entry(r.provider).or_insert(0) += 1;
        }
        Ok(Self {
            count,
            total,
            mean,
            max,
            min,
            unique_payers,
            by_provider,
        })
    }
}

// ---------------------------------------------------------------------------
// Ledger kinds
// ---------------------------------------------------------------------------

pub enum Ledger {
    Csv(CsvLedger),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteLedger),
}

impl Ledger {
    /// Pick a backend from the file extension: `.db`/`.sqlite` is SQLite,
    /// anything else is a CSV ledger.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            #[cfg(feature = "sqlite")]
            Some("db" | "sqlite" | "sqlite3") => Ok(Self::Sqlite(SqliteLedger::open(path)?)),
            _ => Ok(Self::Csv(CsvLedger::new(path.to_path_buf()))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Csv(_) => "csv",
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => "sqlite",
        }
    }
}

impl RecordStore for Ledger {
    fn ensure_ready(&mut self) -> Result<(), StorageError> {
        match self {
            Self::Csv(l) => l.ensure_ready(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(l) => l.ensure_ready(),
        }
    }

    fn append(&mut self, record: &PaymentRecord) -> Result<(), StorageError> {
        match self {
            Self::Csv(l) => l.append(record),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(l) => l.append(record),
        }
    }

    fn records(&self) -> Result<Vec<PaymentRecord>, StorageError> {
        match self {
            Self::Csv(l) => l.records(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(l) => l.records(),
        }
    }

    fn location(&self) -> &Path {
        match self {
            Self::Csv(l) => l.location(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(l) => l.location(),
        }
    }

    fn exists_matching(
        &self,
        date: NaiveDate,
        amount: Decimal,
        provider: Provider,
        payer_name: &str,
    ) -> Result<bool, StorageError> {
        match self {
            Self::Csv(l) => l.exists_matching(date, amount, provider, payer_name),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(l) => l.exists_matching(date, amount, provider, payer_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(amount: Decimal, provider: Provider, payer: &str) -> PaymentRecord {
        PaymentRecord {
            date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            amount,
            provider,
            payer_name: payer.to_string(),
            email_subject: "payment".to_string(),
            processed_at: chrono::Local::now().naive_local(),
        }
    }

    #[test]
    fn test_summary_of_empty_ledger() {
        let stats = SummaryStats::from_records(&[]).unwrap();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.total, Decimal::ZERO);
        assert_eq!(stats.unique_payers, 0);
        assert!(stats.mean.is_none() && stats.max.is_none() && stats.min.is_none());
        assert!(stats.by_provider.is_empty());
    }

    #[test]
    fn test_summary_of_single_record() {
        let fifty = Decimal::new(5000, 2);
        let stats = SummaryStats::from_records(&[record(fifty, Provider::Venmo, "Jane Doe")]).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.total, fifty);
        assert_eq!(stats.mean, Some(fifty));
        assert_eq!(stats.max, Some(fifty));
        assert_eq!(stats.min, Some(fifty));
        assert_eq!(stats.unique_payers, 1);
        assert_eq!(stats.by_provider.get(&Provider::Venmo), Some(&1));
        assert_ne!(stats, SummaryStats::from_records(&[]).unwrap());
    }

    #[test]
    fn test_summary_aggregates() {
        let stats = SummaryStats::from_records(&[
            record(Decimal::new(1000, 2), Provider::Zelle, "A B"),
            record(Decimal::new(2000, 2), Provider::Zelle, "A B"),
            record(Decimal::new(3001, 2), Provider::PayPal, "C D"),
        ])
        .unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.total, Decimal::new(6001, 2));
        assert_eq!(stats.mean, Some(Decimal::new(2000, 2)));
        assert_eq!(stats.max, Some(Decimal::new(3001, 2)));
        assert_eq!(stats.min, Some(Decimal::new(1000, 2)));
        assert_eq!(stats.unique_payers, 2);
        assert_eq!(stats.by_provider.get(&Provider::Zelle), Some(&2));
        assert_eq!(stats.by_provider.get(&Provider::PayPal), Some(&1));
    }

    #[test]
    fn test_summary_total_overflow_is_an_error() {
        let huge = record(Decimal::MAX, Provider::Zelle, "A B");
        let err = SummaryStats::from_records(&[huge.clone(), huge]).unwrap_err();
        assert!(matches!(err, StorageError::TotalOverflow { row: 2, .. }));
    }

    #[test]
    fn test_open_picks_backend_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let csv = Ledger::open(&dir.path().join("payments.csv")).unwrap();
        assert_eq!(csv.kind(), "csv");
        let other = Ledger::open(&dir.path().join("payments.xlsx")).unwrap();
        assert_eq!(other.kind(), "csv");
        #[cfg(feature = "sqlite")]
        {
            let db = Ledger::open(&dir.path().join("payments.db")).unwrap();
            assert_eq!(db.kind(), "sqlite");
        }
    }
}
