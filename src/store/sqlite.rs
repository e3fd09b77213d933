use crate::error::{Result, TriageError};
use crate::store::{is_valid_address, MonitorRegistry, ScanStore};
use crate::types::{
    AddressStatus, MonitoredAddress, RiskLevel, ScanRecord, ScanRecordInput, ScanResult,
    ThreatDetails,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

const SCAN_COLUMNS: &str = "id, message_id, monitored_address_id, sender, recipient, subject, \
     content_preview, scan_result, risk_level, is_quarantined, threat_details, \
     scanned_at, email_received_at";

/// SQLite-backed store. A single connection behind a mutex; every operation
/// is one statement or one short transaction, so per-record operations are
/// linearizable.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    TriageError::Storage(format!(
                        "failed to create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE IF NOT EXISTS monitored_addresses (
                 id TEXT PRIMARY KEY,
                 owner_id TEXT NOT NULL,
                 address TEXT NOT NULL,
                 status TEXT NOT NULL,
                 created_at TEXT NOT NULL,
                 updated_at TEXT NOT NULL,
                 UNIQUE(owner_id, address)
             );
             CREATE TABLE IF NOT EXISTS email_scans (
                 id TEXT PRIMARY KEY,
                 message_id TEXT NOT NULL UNIQUE,
                 monitored_address_id TEXT NOT NULL
                     REFERENCES monitored_addresses(id),
                 sender TEXT NOT NULL,
                 recipient TEXT NOT NULL,
                 subject TEXT NOT NULL,
                 content_preview TEXT NOT NULL,
                 scan_result TEXT NOT NULL,
                 risk_level TEXT NOT NULL,
                 is_quarantined INTEGER NOT NULL,
                 threat_details TEXT,
                 scanned_at TEXT NOT NULL,
                 email_received_at TEXT NOT NULL
             );",
        )
    }
}

// Fixed-width UTC timestamps so the text column sorts chronologically.
fn ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_uuid(idx: usize, value: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn conversion_failure(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn scan_from_row(row: &Row<'_>) -> rusqlite::Result<ScanRecord> {
    let scan_result: String = row.get(7)?;
    let risk_level: String = row.get(8)?;
    let threat_details: Option<String> = row.get(10)?;
    Ok(ScanRecord {
        id: parse_uuid(0, row.get(0)?)?,
        message_id: row.get(1)?,
        monitored_address_id: parse_uuid(2, row.get(2)?)?,
        sender: row.get(3)?,
        recipient: row.get(4)?,
        subject: row.get(5)?,
        content_preview: row.get(6)?,
        scan_result: ScanResult::parse(&scan_result)
            .ok_or_else(|| conversion_failure(7, format!("unknown scan result: {scan_result}")))?,
        risk_level: RiskLevel::parse(&risk_level)
            .ok_or_else(|| conversion_failure(8, format!("unknown risk level: {risk_level}")))?,
        is_quarantined: row.get(9)?,
        threat_details: threat_details
            .map(|json| {
                serde_json::from_str::<ThreatDetails>(&json)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))
            })
            .transpose()?,
        scanned_at: parse_ts(11, row.get(11)?)?,
        email_received_at: parse_ts(12, row.get(12)?)?,
    })
}

fn address_from_row(row: &Row<'_>) -> rusqlite::Result<MonitoredAddress> {
    let status: String = row.get(3)?;
    Ok(MonitoredAddress {
        id: parse_uuid(0, row.get(0)?)?,
        owner_id: row.get(1)?,
        address: row.get(2)?,
        status: AddressStatus::parse(&status)
            .ok_or_else(|| conversion_failure(3, format!("unknown address status: {status}")))?,
        created_at: parse_ts(4, row.get(4)?)?,
        updated_at: parse_ts(5, row.get(5)?)?,
    })
}

impl MonitorRegistry for SqliteStore {
    fn register(&self, owner_id: &str, address: &str) -> Result<MonitoredAddress> {
        if !is_valid_address(address) {
            return Err(TriageError::InvalidAddress {
                address: address.to_string(),
            });
        }
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM monitored_addresses WHERE owner_id = ?1 AND address = ?2)",
            params![owner_id, address],
            |row| row.get(0),
        )?;
        if exists {
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
        conn.execute(
            "INSERT INTO monitored_addresses (id, owner_id, address, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                monitored.id.to_string(),
                monitored.owner_id,
                monitored.address,
                monitored.status.as_str(),
                ts(monitored.created_at),
                ts(monitored.updated_at),
            ],
        )?;
        Ok(monitored)
    }

    fn find_active(&self, address: &str, owner_id: &str) -> Result<Option<MonitoredAddress>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, address, status, created_at, updated_at
             FROM monitored_addresses
             WHERE address = ?1 AND owner_id = ?2 AND status = 'active'",
        )?;
        let mut rows = stmt.query_map(params![address, owner_id], address_from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn set_status(&self, id: Uuid, status: AddressStatus) -> Result<MonitoredAddress> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE monitored_addresses SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), ts(Utc::now()), id.to_string()],
        )?;
        if changed == 0 {
            return Err(TriageError::RecordNotFound { id });
        }
        let monitored = conn.query_row(
            "SELECT id, owner_id, address, status, created_at, updated_at
             FROM monitored_addresses WHERE id = ?1",
            params![id.to_string()],
            address_from_row,
        )?;
        Ok(monitored)
    }

    fn list_addresses(&self, owner_id: &str) -> Result<Vec<MonitoredAddress>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, address, status, created_at, updated_at
             FROM monitored_addresses WHERE owner_id = ?1 ORDER BY created_at DESC",
        )?;
        let addresses = stmt
            .query_map(params![owner_id], address_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(addresses)
    }
}

impl ScanStore for SqliteStore {
    fn insert_scan(&self, input: ScanRecordInput) -> Result<ScanRecord> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM email_scans WHERE message_id = ?1)",
            params![input.message_id],
            |row| row.get(0),
        )?;
        if exists {
            return Err(TriageError::DuplicateMessage {
                message_id: input.message_id,
            });
        }
        let details_json = input
            .threat_details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| TriageError::Storage(format!("threat details encoding: {e}")))?;
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
        conn.execute(
            &format!("INSERT INTO email_scans ({SCAN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
            params![
                record.id.to_string(),
                record.message_id,
                record.monitored_address_id.to_string(),
                record.sender,
                record.recipient,
                record.subject,
                record.content_preview,
                record.scan_result.as_str(),
                record.risk_level.as_str(),
                record.is_quarantined,
                details_json,
                ts(record.scanned_at),
                ts(record.email_received_at),
            ],
        )?;
        Ok(record)
    }

    fn get_scan(&self, id: Uuid) -> Result<ScanRecord> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SCAN_COLUMNS} FROM email_scans WHERE id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![id.to_string()], scan_from_row)?;
        match rows.next() {
            Some(row) => Ok(row?),
            None => Err(TriageError::RecordNotFound { id }),
        }
    }

    fn list_scans(&self, owner_id: &str) -> Result<Vec<ScanRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT s.id, s.message_id, s.monitored_address_id, s.sender, s.recipient, \
             s.subject, s.content_preview, s.scan_result, s.risk_level, s.is_quarantined, \
             s.threat_details, s.scanned_at, s.email_received_at \
             FROM email_scans s \
             JOIN monitored_addresses a ON a.id = s.monitored_address_id \
             WHERE a.owner_id = ?1 \
             ORDER BY s.email_received_at DESC",
        )?;
        let records = stmt
            .query_map(params![owner_id], scan_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn set_quarantined(&self, id: Uuid, value: bool) -> Result<ScanRecord> {
        {
            let conn = self.conn.lock().unwrap();
            let changed = conn.execute(
                "UPDATE email_scans SET is_quarantined = ?1 WHERE id = ?2",
                params![value, id.to_string()],
            )?;
            if changed == 0 {
                return Err(TriageError::RecordNotFound { id });
            }
        }
        self.get_scan(id)
    }

    fn delete_scan(&self, id: Uuid) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "DELETE FROM email_scans WHERE id = ?1",
            params![id.to_string()],
        )?;
        if changed == 0 {
            return Err(TriageError::RecordNotFound { id });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phishing_input(monitored_address_id: Uuid, message_id: &str) -> ScanRecordInput {
        ScanRecordInput {
            message_id: message_id.to_string(),
            monitored_address_id,
            sender: "notifications@bank.com".to_string(),
            recipient: "user@example.com".to_string(),
            subject: "Verify your account".to_string(),
            content_preview: "verify your login credentials".to_string(),
            scan_result: ScanResult::Phishing,
            risk_level: RiskLevel::Critical,
            is_quarantined: true,
            threat_details: Some(ThreatDetails {
                threat_type: "phishing".to_string(),
                indicators: vec![
                    "suspicious_links".to_string(),
                    "credential_harvesting".to_string(),
                ],
            }),
            scanned_at: Utc::now(),
            email_received_at: Utc::now(),
        }
    }

    #[test]
    fn record_round_trips_including_threat_details() {
        let store = SqliteStore::open_in_memory().unwrap();
        let monitored = store.register("o1", "user@example.com").unwrap();
        let inserted = store.insert_scan(phishing_input(monitored.id, "msg_1")).unwrap();

        let fetched = store.get_scan(inserted.id).unwrap();
        assert_eq!(fetched.message_id, "msg_1");
        assert_eq!(fetched.monitored_address_id, monitored.id);
        assert_eq!(fetched.scan_result, ScanResult::Phishing);
        assert_eq!(fetched.risk_level, RiskLevel::Critical);
        assert!(fetched.is_quarantined);
        assert_eq!(fetched.threat_details, inserted.threat_details);
    }

    #[test]
    fn duplicate_message_id_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let monitored = store.register("o1", "user@example.com").unwrap();
        store.insert_scan(phishing_input(monitored.id, "msg_1")).unwrap();
        assert!(matches!(
            store.insert_scan(phishing_input(monitored.id, "msg_1")),
            Err(TriageError::DuplicateMessage { .. })
        ));
    }

    #[test]
    fn set_quarantined_updates_and_returns_the_record() {
        let store = SqliteStore::open_in_memory().unwrap();
        let monitored = store.register("o1", "user@example.com").unwrap();
        let record = store.insert_scan(phishing_input(monitored.id, "msg_1")).unwrap();

        let released = store.set_quarantined(record.id, false).unwrap();
        assert!(!released.is_quarantined);
        assert!(!store.get_scan(record.id).unwrap().is_quarantined);
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let monitored = store.register("o1", "user@example.com").unwrap();
        let record = store.insert_scan(phishing_input(monitored.id, "msg_1")).unwrap();

        store.delete_scan(record.id).unwrap();
        assert!(matches!(
            store.get_scan(record.id),
            Err(TriageError::RecordNotFound { .. })
        ));
        assert!(matches!(
            store.delete_scan(record.id),
            Err(TriageError::RecordNotFound { .. })
        ));
    }

    #[test]
    fn list_scans_joins_on_owner_and_orders_by_received_desc() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mine = store.register("o1", "user@example.com").unwrap();
        let theirs = store.register("o2", "other@example.com").unwrap();

        let mut older = phishing_input(mine.id, "msg_old");
        older.email_received_at = Utc::now() - chrono::Duration::seconds(90);
        store.insert_scan(older).unwrap();
        store.insert_scan(phishing_input(mine.id, "msg_new")).unwrap();
        store.insert_scan(phishing_input(theirs.id, "msg_theirs")).unwrap();

        let records = store.list_scans("o1").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message_id, "msg_new");
        assert_eq!(records[1].message_id, "msg_old");
    }

    #[test]
    fn registry_status_toggle_gates_find_active() {
        let store = SqliteStore::open_in_memory().unwrap();
        let monitored = store.register("o1", "user@example.com").unwrap();
        assert!(store.find_active("user@example.com", "o1").unwrap().is_some());

        store
            .set_status(monitored.id, AddressStatus::Inactive)
            .unwrap();
        assert!(store.find_active("user@example.com", "o1").unwrap().is_none());

        store
            .set_status(monitored.id, AddressStatus::Active)
            .unwrap();
        assert!(store.find_active("user@example.com", "o1").unwrap().is_some());
    }

    #[test]
    fn open_creates_missing_database_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/warden.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        store.register("o1", "user@example.com").unwrap();
        assert!(path.exists());
    }
}
