//! Pull-model reporting over the stores: consumers re-read current state
//! after a mutation, nothing is pushed.

use crate::error::Result;
use crate::store::{MonitorRegistry, ScanStore};
use crate::types::AddressStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct OwnerSummary {
    pub monitored_addresses: usize,
    pub total_scans: usize,
    pub threats_detected: usize,
    pub quarantined: usize,
    /// Scan counts keyed by category name, stable order.
    pub by_category: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddressStats {
    pub address: String,
    pub status: AddressStatus,
    pub threat_count: usize,
    pub last_scan: Option<DateTime<Utc>>,
}

pub fn owner_summary<R, S>(registry: &R, store: &S, owner_id: &str) -> Result<OwnerSummary>
where
    R: MonitorRegistry,
    S: ScanStore,
{
    let addresses = registry.list_addresses(owner_id)?;
    let scans = store.list_scans(owner_id)?;

    let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
    for record in &scans {
        *by_category
            .entry(record.scan_result.as_str().to_string())
            .or_insert(0) += 1;
    }

    Ok(OwnerSummary {
        monitored_addresses: addresses.len(),
        total_scans: scans.len(),
        threats_detected: scans.iter().filter(|r| r.scan_result.is_threat()).count(),
        quarantined: scans.iter().filter(|r| r.is_quarantined).count(),
        by_category,
    })
}

/// Per-address threat count and most recent scan time.
pub fn address_stats<R, S>(registry: &R, store: &S, owner_id: &str) -> Result<Vec<AddressStats>>
where
    R: MonitorRegistry,
    S: ScanStore,
{
    let addresses = registry.list_addresses(owner_id)?;
    let scans = store.list_scans(owner_id)?;

    Ok(addresses
        .into_iter()
        .map(|monitored| {
            let threat_count = scans
                .iter()
                .filter(|r| r.monitored_address_id == monitored.id && r.scan_result.is_threat())
                .count();
            let last_scan = scans
                .iter()
                .filter(|r| r.monitored_address_id == monitored.id)
                .map(|r| r.scanned_at)
                .max();
            AddressStats {
                address: monitored.address,
                status: monitored.status,
                threat_count,
                last_scan,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::TriagePipeline;
    use crate::samples;
    use crate::scanner::ScanEngine;
    use crate::store::MemoryStore;

    #[test]
    fn summary_counts_after_a_simulated_batch() {
        let store = MemoryStore::new();
        let engine = ScanEngine::new(&Config::default());
        store.register("o1", "user@example.com").unwrap();

        let pipeline = TriagePipeline::new(&store, &store, &engine);
        let batch = samples::sample_batch_tagged("user@example.com", "t1");
        pipeline.ingest("o1", "user@example.com", &batch).unwrap();

        let summary = owner_summary(&store, &store, "o1").unwrap();
        assert_eq!(summary.monitored_addresses, 1);
        assert_eq!(summary.total_scans, 4);
        assert_eq!(summary.threats_detected, 2); // phishing + spam
        assert_eq!(summary.quarantined, 1);
        assert_eq!(summary.by_category.get("clean"), Some(&2));
        assert_eq!(summary.by_category.get("phishing"), Some(&1));
        assert_eq!(summary.by_category.get("spam"), Some(&1));
    }

    #[test]
    fn address_stats_track_threats_and_last_scan() {
        let store = MemoryStore::new();
        let engine = ScanEngine::new(&Config::default());
        store.register("o1", "user@example.com").unwrap();
        store.register("o1", "quiet@example.com").unwrap();

        let pipeline = TriagePipeline::new(&store, &store, &engine);
        let batch = samples::sample_batch_tagged("user@example.com", "t1");
        pipeline.ingest("o1", "user@example.com", &batch).unwrap();

        let stats = address_stats(&store, &store, "o1").unwrap();
        assert_eq!(stats.len(), 2);

        let busy = stats.iter().find(|s| s.address == "user@example.com").unwrap();
        assert_eq!(busy.threat_count, 2);
        assert!(busy.last_scan.is_some());

        let quiet = stats.iter().find(|s| s.address == "quiet@example.com").unwrap();
        assert_eq!(quiet.threat_count, 0);
        assert!(quiet.last_scan.is_none());
    }

    #[test]
    fn empty_owner_has_an_empty_summary() {
        let store = MemoryStore::new();
        let summary = owner_summary(&store, &store, "nobody").unwrap();
        assert_eq!(summary.monitored_addresses, 0);
        assert_eq!(summary.total_scans, 0);
        assert!(summary.by_category.is_empty());
    }
}
