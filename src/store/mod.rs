mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::{AddressStatus, MonitoredAddress, ScanRecord, ScanRecordInput};
use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

lazy_static! {
    static ref ADDRESS_PATTERN: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap();
}

pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_PATTERN.is_match(address)
}

/// Set of addresses under active surveillance. The pipeline only needs
/// membership lookup; registration and status toggles exist for the
/// surrounding tooling.
pub trait MonitorRegistry {
    fn register(&self, owner_id: &str, address: &str) -> Result<MonitoredAddress>;

    /// Resolve an address to its monitoring record, `None` when the address
    /// is unknown or inactive. This is the monitoring gate's lookup.
    fn find_active(&self, address: &str, owner_id: &str) -> Result<Option<MonitoredAddress>>;

    fn set_status(&self, id: Uuid, status: AddressStatus) -> Result<MonitoredAddress>;

    fn list_addresses(&self, owner_id: &str) -> Result<Vec<MonitoredAddress>>;
}

/// Persistence contract for scan records. One record per processed email,
/// keyed by a unique message id.
pub trait ScanStore {
    /// Create a record. Fails with `DuplicateMessage` when the message id was
    /// scanned before.
    fn insert_scan(&self, input: ScanRecordInput) -> Result<ScanRecord>;

    fn get_scan(&self, id: Uuid) -> Result<ScanRecord>;

    /// All records for an owner's monitored addresses, newest received first.
    fn list_scans(&self, owner_id: &str) -> Result<Vec<ScanRecord>>;

    fn set_quarantined(&self, id: Uuid, value: bool) -> Result<ScanRecord>;

    fn delete_scan(&self, id: Uuid) -> Result<()>;
}
