use crate::error::{Result, TriageError};
use crate::samples;
use crate::scanner::{should_quarantine, ScanEngine};
use crate::store::{MonitorRegistry, ScanStore};
use crate::types::{content_preview, EmailCandidate, ScanRecordInput};
use chrono::Utc;
use serde::Serialize;

/// Per-batch outcome. Best-effort semantics: one candidate's failure never
/// blocks the rest of the batch.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    /// Duplicate message ids, skipped without creating a second record.
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<BatchFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub message_id: String,
    pub reason: String,
}

/// Scan -> policy -> store, gated by the monitoring registry.
pub struct TriagePipeline<'a, R: MonitorRegistry, S: ScanStore> {
    registry: &'a R,
    store: &'a S,
    engine: &'a ScanEngine,
}

impl<'a, R: MonitorRegistry, S: ScanStore> TriagePipeline<'a, R, S> {
    pub fn new(registry: &'a R, store: &'a S, engine: &'a ScanEngine) -> Self {
        Self {
            registry,
            store,
            engine,
        }
    }

    /// Classify and store a batch of candidates for one monitored address.
    ///
    /// The monitoring gate runs first: an unknown or inactive address drops
    /// the whole batch before anything is scanned or stored, and the caller
    /// gets `AddressNotMonitored`.
    pub fn ingest(
        &self,
        owner_id: &str,
        address: &str,
        candidates: &[EmailCandidate],
    ) -> Result<BatchReport> {
        let monitored = match self.registry.find_active(address, owner_id)? {
            Some(monitored) => monitored,
            None => {
                log::warn!("Dropping batch for {address}: not monitored or inactive");
                return Err(TriageError::AddressNotMonitored {
                    address: address.to_string(),
                    owner_id: owner_id.to_string(),
                });
            }
        };

        let mut report = BatchReport::default();
        for email in candidates {
            let verdict = self.engine.classify(email);
            let quarantined = should_quarantine(verdict.scan_result, verdict.risk_level);
            let input = ScanRecordInput {
                message_id: email.message_id.clone(),
                monitored_address_id: monitored.id,
                sender: email.sender.clone(),
                recipient: email.recipient.clone(),
                subject: email.subject.clone(),
                content_preview: content_preview(&email.content),
                scan_result: verdict.scan_result,
                risk_level: verdict.risk_level,
                is_quarantined: quarantined,
                threat_details: verdict.threat_details,
                scanned_at: Utc::now(),
                email_received_at: email.received_at,
            };
            match self.store.insert_scan(input) {
                Ok(record) => {
                    report.processed += 1;
                    log::info!(
                        "Scanned {}: {} ({}){}",
                        record.message_id,
                        record.scan_result.as_str(),
                        record.risk_level.as_str(),
                        if record.is_quarantined {
                            ", quarantined"
                        } else {
                            ""
                        }
                    );
                }
                Err(TriageError::DuplicateMessage { message_id }) => {
                    report.skipped += 1;
                    log::debug!("Skipping {message_id}: already scanned");
                }
                Err(e) => {
                    report.failed += 1;
                    log::error!("Failed to store scan for {}: {e}", email.message_id);
                    report.failures.push(BatchFailure {
                        message_id: email.message_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Run the simulated ingestion driver against a monitored address.
    pub fn simulate(&self, owner_id: &str, address: &str) -> Result<BatchReport> {
        let batch = samples::sample_batch(address);
        self.ingest(owner_id, address, &batch)
    }
}
