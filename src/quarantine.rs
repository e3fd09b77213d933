use crate::error::Result;
use crate::store::ScanStore;
use crate::types::ScanRecord;
use uuid::Uuid;

/// Result of a lifecycle operation. `NoOp` means the record was already in
/// the requested state; the record is returned untouched. Operating on an
/// unknown id is a `RecordNotFound` error, never a silent no-op.
#[derive(Debug, Clone)]
pub enum Transition {
    Applied(ScanRecord),
    NoOp(ScanRecord),
}

impl Transition {
    pub fn record(&self) -> &ScanRecord {
        match self {
            Transition::Applied(record) | Transition::NoOp(record) => record,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }
}

/// Drives the per-record state machine: Active <-> Quarantined, plus the
/// terminal Deleted state. Only `is_quarantined` is ever mutated; everything
/// else on a record is immutable after creation.
pub struct QuarantineManager<'a, S: ScanStore> {
    store: &'a S,
}

impl<'a, S: ScanStore> QuarantineManager<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Manual escalation of an active record. Permitted on any active record
    /// regardless of its risk level.
    pub fn quarantine(&self, id: Uuid) -> Result<Transition> {
        self.set_state(id, true)
    }

    /// Return a quarantined record to the inbox view. The record remains
    /// stored.
    pub fn release(&self, id: Uuid) -> Result<Transition> {
        self.set_state(id, false)
    }

    /// Permanent purge, allowed from either state. Terminal: every later
    /// operation on this id is `RecordNotFound`.
    pub fn delete(&self, id: Uuid) -> Result<ScanRecord> {
        let record = self.store.get_scan(id)?;
        self.store.delete_scan(id)?;
        log::info!(
            "Purged scan record {id} (message {}, {})",
            record.message_id,
            record.scan_result.as_str()
        );
        Ok(record)
    }

    fn set_state(&self, id: Uuid, quarantined: bool) -> Result<Transition> {
        let record = self.store.get_scan(id)?;
        if record.is_quarantined == quarantined {
            log::debug!("Scan record {id} already has quarantined={quarantined}");
            return Ok(Transition::NoOp(record));
        }
        let updated = self.store.set_quarantined(id, quarantined)?;
        log::info!(
            "Scan record {id} {}",
            if quarantined { "quarantined" } else { "released" }
        );
        Ok(Transition::Applied(updated))
    }
}
