use std::collections::HashSet;

use tracing::{info, warn};

use crate::models::{MessageId, PaymentRecord};
use crate::store::RecordStore;

/// Message identifiers already handled by this process. Never persisted.
#[derive(Debug, Default)]
pub struct SeenSet {
    ids: HashSet<MessageId>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    /// Returns false if the id was already present.
    pub fn insert(&mut self, id: MessageId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Persist,
    /// The originating message was handled earlier in this process.
    SeenMessage,
    /// The ledger already holds a payment with the same date, amount,
    /// provider and payer.
    DuplicateRecord,
}

/// Decide whether `candidate` should be written to `store`.
///
/// Neither check is transactional; they assume a single writer.
pub fn should_persist<S: RecordStore + ?Sized>(
    message_id: &MessageId,
    candidate: &PaymentRecord,
    seen: &SeenSet,
    store: &S,
) -> Verdict {
    if seen.contains(message_id) {
        return Verdict::SeenMessage;
    }
    if already_recorded(candidate, store) {
        info!(
            "Record already exists, skipping: {} - ${} - {}",
            candidate.provider, candidate.amount, candidate.payer_name
        );
        return Verdict::DuplicateRecord;
    }
    Verdict::Persist
}

/// Content-equality lookup. A store that cannot be read counts as "not
/// recorded" so a payment is not silently dropped.
pub fn already_recorded<S: RecordStore + ?Sized>(candidate: &PaymentRecord, store: &S) -> bool {
    store
        .exists_matching(
            candidate.date,
            candidate.amount,
            candidate.provider,
            &candidate.payer_name,
        )
        .unwrap_or_else(|e| {
            warn!("Error checking record existence: {e}");
            false
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use crate::store::csv_ledger::CsvLedger;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn test_store() -> (tempfile::TempDir, CsvLedger) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvLedger::new(dir.path().join("payments.csv"));
        store.ensure_ready().unwrap();
        (dir, store)
    }

    fn record(amount: Decimal, subject: &str) -> PaymentRecord {
        PaymentRecord {
            date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            amount,
            provider: Provider::Zelle,
            payer_name: "John Smith".to_string(),
            email_subject: subject.to_string(),
            processed_at: chrono::Local::now().naive_local(),
        }
    }

    #[test]
    fn test_new_record_persists() {
        let (_dir, store) = test_store();
        let seen = SeenSet::new();
        let verdict = should_persist(&"1".into(), &record(Decimal::new(5000, 2), "a"), &seen, &store);
        assert_eq!(verdict, Verdict::Persist);
    }

    #[test]
    fn test_seen_message_short_circuits() {
        let (_dir, store) = test_store();
        let mut seen = SeenSet::new();
        seen.insert("1".into());
        let verdict = should_persist(&"1".into(), &record(Decimal::new(5000, 2), "a"), &seen, &store);
        assert_eq!(verdict, Verdict::SeenMessage);
    }

    #[test]
    fn test_subject_is_not_part_of_the_key() {
        let (_dir, mut store) = test_store();
        store.append(&record(Decimal::new(5000, 2), "You received a payment")).unwrap();
        let seen = SeenSet::new();
        let verdict = should_persist(
            &"2".into(),
            &record(Decimal::new(5000, 2), "Payment received!"),
            &seen,
            &store,
        );
        assert_eq!(verdict, Verdict::DuplicateRecord);
    }

    #[test]
    fn test_one_cent_difference_is_distinct() {
        let (_dir, mut store) = test_store();
        store.append(&record(Decimal::new(5000, 2), "a")).unwrap();
        let seen = SeenSet::new();
        let verdict = should_persist(&"2".into(), &record(Decimal::new(5001, 2), "a"), &seen, &store);
        assert_eq!(verdict, Verdict::Persist);
    }

    #[test]
    fn test_seen_set_insert_reports_novelty() {
        let mut seen = SeenSet::new();
        assert!(seen.is_empty());
        assert!(seen.insert("7".into()));
        assert!(!seen.insert("7".into()));
        assert_eq!(seen.len(), 1);
    }
}
