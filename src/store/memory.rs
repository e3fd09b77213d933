use crate::error::{Result, TriageError};
use crate::store::{is_valid_address, MonitorRegistry, ScanStore};
use crate::types::{AddressStatus, MonitoredAddress, ScanRecord, ScanRecordInput};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct State {
    addresses: HashMap<Uuid, MonitoredAddress>,
    scans: HashMap<Uuid, ScanRecord>,
}

/// In-process store, the reference collaborator implementation. Every
/// operation takes the single state lock, so per-record operations are
/// linearizable.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MonitorRegistry for MemoryStore {
    fn register(&self, owner_id: &str, address: &str) -> Result<MonitoredAddress> {
        if !is_valid_address(address) {
            return Err(TriageError::InvalidAddress {
                address: address.to_string(),
            });
        }
        let mut state = self.state.lock().unwrap();
        let duplicate = state
            .addresses
            .values()
            .any(|a| a.owner_id == owner_id && a.address == address);
        if duplicate {
            return Err(TriageError::DuplicateAddress {
                address: address.to_string(),
            });
        }
        let now = Utc::now();
        let monitored = MonitoredAddress {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            address: address.to_string(),
            status: AddressStatus::Active,
            created_at: now,
            updated_at: now,
        };
        state.addresses.insert(monitored.id, monitored.clone());
        Ok(monitored)
    }

    fn find_active(&self, address: &str, owner_id: &str) -> Result<Option<MonitoredAddress>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .addresses
            .values()
            .find(|a| {
                a.owner_id == owner_id
                    && a.address == address
                    && a.status == AddressStatus::Active
            })
            .cloned())
    }

    fn set_status(&self, id: Uuid, status: AddressStatus) -> Result<MonitoredAddress> {
        let mut state = self.state.lock().unwrap();
        let monitored = state
            .addresses
            .get_mut(&id)
            .ok_or(TriageError::RecordNotFound { id })?;
        monitored.status = status;
        monitored.updated_at = Utc::now();
        Ok(monitored.clone())
    }

    fn list_addresses(&self, owner_id: &str) -> Result<Vec<MonitoredAddress>> {
        let state = self.state.lock().unwrap();
        let mut addresses: Vec<MonitoredAddress> = state
            .addresses
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        addresses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(addresses)
    }
}

impl ScanStore for MemoryStore {
    fn insert_scan(&self, input: ScanRecordInput) -> Result<ScanRecord> {
        let mut state = self.state.lock().unwrap();
        // Same semantics as the sqlite unique index: deleting a record frees
        // its message id again.
        if state
            .scans
            .values()
            .any(|r| r.message_id == input.message_id)
        {
            return Err(TriageError::DuplicateMessage {
                message_id: input.message_id,
            });
        }
        let record = ScanRecord {
            id: Uuid::new_v4(),
            message_id: input.message_id,
            monitored_address_id: input.monitored_address_id,
            sender: input.sender,
            recipient: input.recipient,
            subject: input.subject,
            content_preview: input.content_preview,
            scan_result: input.scan_result,
            risk_level: input.risk_level,
            is_quarantined: input.is_quarantined,
            threat_details: input.threat_details,
            scanned_at: input.scanned_at,
            email_received_at: input.email_received_at,
        };
        state.scans.insert(record.id, record.clone());
        Ok(record)
    }

    fn get_scan(&self, id: Uuid) -> Result<ScanRecord> {
        let state = self.state.lock().unwrap();
        state
            .scans
            .get(&id)
            .cloned()
            .ok_or(TriageError::RecordNotFound { id })
    }

    fn list_scans(&self, owner_id: &str) -> Result<Vec<ScanRecord>> {
        let state = self.state.lock().unwrap();
        let owned: Vec<Uuid> = state
            .addresses
            .values()
            .filter(|a| a.owner_id == owner_id)
            .map(|a| a.id)
            .collect();
        let mut records: Vec<ScanRecord> = state
            .scans
            .values()
            .filter(|r| owned.contains(&r.monitored_address_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.email_received_at.cmp(&a.email_received_at));
        Ok(records)
    }

    fn set_quarantined(&self, id: Uuid, value: bool) -> Result<ScanRecord> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .scans
            .get_mut(&id)
            .ok_or(TriageError::RecordNotFound { id })?;
        record.is_quarantined = value;
        Ok(record.clone())
    }

    fn delete_scan(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .scans
            .remove(&id)
            .map(|_| ())
            .ok_or(TriageError::RecordNotFound { id })
    }
}
