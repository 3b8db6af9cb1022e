use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::dedup::{self, should_persist, SeenSet, Verdict};
use crate::error::{MailError, PennyError, Result};
use crate::extractor::process_message;
use crate::mail::MailSource;
use crate::models::{MessageId, PaymentRecord, RawMessage};
use crate::providers;
use crate::shutdown::Shutdown;
use crate::store::RecordStore;

/// Pause after a cycle fails outright, instead of the normal interval.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// A record whose write failed. Its message is already marked handled, so
/// the record itself is retried at the start of the next cycle.
struct PendingWrite {
    message_id: MessageId,
    record: PaymentRecord,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    /// New rows actually written this cycle, including retried writes.
    pub records_processed: usize,
    pub messages_examined: usize,
    pub duplicates: usize,
    pub failed_senders: Vec<String>,
    /// Messages handled since the process started.
    pub total_handled: usize,
    pub pending_writes: usize,
    pub duration: Duration,
    pub interrupted: bool,
}

/// Polls the mailbox sender by sender and appends new payments to the
/// ledger. One cycle runs to completion before the next begins.
pub struct Tracker<M, S> {
    mail: M,
    store: S,
    seen: SeenSet,
    pending: Vec<PendingWrite>,
    check_interval: Duration,
}

impl<M: MailSource, S: RecordStore> Tracker<M, S> {
    pub fn new(mail: M, store: S, check_interval: Duration) -> Self {
        info!(
            "Income tracker initialized with {} payment senders",
            providers::all_sender_addresses().len()
        );
        Self {
            mail,
            store,
            seen: SeenSet::new(),
            pending: Vec::new(),
            check_interval,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Startup checks: the mailbox accepts our login, the ledger can be
    /// prepared and the provider table is populated. Any failure is fatal.
    pub fn verify(&mut self) -> Result<()> {
        self.mail.verify()?;
        self.store.ensure_ready()?;
        if providers::patterns().is_empty() {
            return Err(PennyError::Other("No payment providers configured".to_string()));
        }
        info!("Startup checks passed for ledger {}", self.store.location().display());
        Ok(())
    }

    /// One pass over every known sender address.
    ///
    /// Connection failures are contained per sender and extraction failures
    /// per message; only a ledger that cannot be prepared fails the cycle.
    pub fn run_single_check(&mut self, shutdown: &Shutdown) -> Result<CycleReport> {
        info!("Starting email check cycle");
        let start = Instant::now();
        self.store.ensure_ready()?;

        let mut report = CycleReport {
            records_processed: self.retry_pending(),
            ..CycleReport::default()
        };

        for sender in providers::all_sender_addresses() {
            if shutdown.is_triggered() {
                report.interrupted = true;
                break;
            }
            if let Err(e) = self.process_sender(sender, shutdown, &mut report) {
                error!("Email connection error while processing {sender}: {e}");
                report.failed_senders.push(sender.to_string());
            }
        }

        report.total_handled = self.seen.len();
        report.pending_writes = self.pending.len();
        report.duration = start.elapsed();
        info!(
            "Check cycle completed: {} new records, {:.2}s duration",
            report.records_processed,
            report.duration.as_secs_f64()
        );
        Ok(report)
    }

    fn process_sender(
        &mut self,
        sender: &str,
        shutdown: &Shutdown,
        report: &mut CycleReport,
    ) -> std::result::Result<(), MailError> {
        let ids = self.mail.search_by_sender(sender)?;
        debug!("Found {} emails from {sender}", ids.len());

        for id in ids {
            if shutdown.is_triggered() {
                report.interrupted = true;
                break;
            }
            if self.seen.contains(&id) {
                continue;
            }
            // A message that cannot be fetched now is left unmarked and tried
            // again next cycle.
            let Some(raw) = self.mail.fetch_message(&id)? else {
                continue;
            };
            report.messages_examined += 1;
            self.handle_message(&raw, report);
            self.seen.insert(id);
        }
        Ok(())
    }

    fn handle_message(&mut self, raw: &RawMessage, report: &mut CycleReport) {
        let record = match process_message(raw) {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("Message {} is not a payment notification", raw.id);
                return;
            }
            Err(e) => {
                error!("Failed to process message {} ({}): {e}", raw.id, raw.subject);
                return;
            }
        };

        match should_persist(&raw.id, &record, &self.seen, &self.store) {
            Verdict::Persist => {}
            Verdict::SeenMessage => return,
            Verdict::DuplicateRecord => {
                report.duplicates += 1;
                return;
            }
        }

        match self.store.append(&record) {
            Ok(()) => {
                report.records_processed += 1;
                info!(
                    "New payment: ${} from {} via {}",
                    record.amount, record.payer_name, record.provider
                );
            }
            Err(e) => {
                error!("Failed to save payment record: {e}");
                self.pending.push(PendingWrite {
                    message_id: raw.id.clone(),
                    record,
                });
            }
        }
    }

    fn retry_pending(&mut self) -> usize {
        let mut saved = 0;
        for write in std::mem::take(&mut self.pending) {
            if dedup::already_recorded(&write.record, &self.store) {
                continue;
            }
            match self.store.append(&write.record) {
                Ok(()) => {
                    saved += 1;
                    info!(
                        "Saved previously failed payment from message {}: ${} from {}",
                        write.message_id, write.record.amount, write.record.payer_name
                    );
                }
                Err(e) => {
                    warn!("Retry of message {} failed again: {e}", write.message_id);
                    self.pending.push(write);
                }
            }
        }
        saved
    }

    /// Check, sleep, repeat until `shutdown` is triggered.
    pub fn run_continuous(&mut self, shutdown: &Shutdown) {
        info!(
            "Starting continuous monitoring (check every {}s)",
            self.check_interval.as_secs()
        );
        while !shutdown.is_triggered() {
            let pause = match self.run_single_check(shutdown) {
                Ok(report) => {
                    if !report.failed_senders.is_empty() {
                        warn!("Check cycle had errors, continuing monitoring");
                    }
                    info!("Next check in {} seconds", self.check_interval.as_secs());
                    self.check_interval
                }
                Err(e) => {
                    error!("Unexpected error in monitoring loop: {e}");
                    info!("Retrying in {} seconds...", ERROR_BACKOFF.as_secs());
                    ERROR_BACKOFF
                }
            };
            if shutdown.wait(pause) {
                break;
            }
        }
        for write in &self.pending {
            warn!(
                "Payment never saved (message {}): {} ${} from {} on {}",
                write.message_id,
                write.record.provider,
                write.record.amount,
                write.record.payer_name,
                write.record.date
            );
        }
        if !self.seen.is_empty() {
            info!("Handled {} messages this session", self.seen.len());
        }
        info!("Monitoring session ended");
    }
}
