use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of characters of email content kept on a scan record.
pub const CONTENT_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanResult {
    Clean,
    Spam,
    Phishing,
    Malware,
    Suspicious,
}

impl ScanResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanResult::Clean => "clean",
            ScanResult::Spam => "spam",
            ScanResult::Phishing => "phishing",
            ScanResult::Malware => "malware",
            ScanResult::Suspicious => "suspicious",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "clean" => Some(ScanResult::Clean),
            "spam" => Some(ScanResult::Spam),
            "phishing" => Some(ScanResult::Phishing),
            "malware" => Some(ScanResult::Malware),
            "suspicious" => Some(ScanResult::Suspicious),
            _ => None,
        }
    }

    /// Anything other than a clean verdict counts as a detected threat.
    pub fn is_threat(&self) -> bool {
        !matches!(self, ScanResult::Clean)
    }
}

/// Ordinal severity, independent of the threat category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            "critical" => Some(RiskLevel::Critical),
            _ => None,
        }
    }
}

/// Structured evidence attached to a non-clean verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatDetails {
    #[serde(rename = "type")]
    pub threat_type: String,
    pub indicators: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressStatus {
    Active,
    Inactive,
}

impl AddressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressStatus::Active => "active",
            AddressStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AddressStatus::Active),
            "inactive" => Some(AddressStatus::Inactive),
            _ => None,
        }
    }
}

/// An email address an owner has registered for threat surveillance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredAddress {
    pub id: Uuid,
    pub owner_id: String,
    pub address: String,
    pub status: AddressStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ephemeral ingestion input. Consumed exactly once by the scanner; only the
/// resulting scan record is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailCandidate {
    pub message_id: String,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub content: String,
    pub received_at: DateTime<Utc>,
}

/// The stored verdict for one evaluated email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: Uuid,
    pub message_id: String,
    pub monitored_address_id: Uuid,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub content_preview: String,
    pub scan_result: ScanResult,
    pub risk_level: RiskLevel,
    pub is_quarantined: bool,
    pub threat_details: Option<ThreatDetails>,
    pub scanned_at: DateTime<Utc>,
    pub email_received_at: DateTime<Utc>,
}

/// Everything the store needs to create a scan record; the store assigns the id.
#[derive(Debug, Clone)]
pub struct ScanRecordInput {
    pub message_id: String,
    pub monitored_address_id: Uuid,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub content_preview: String,
    pub scan_result: ScanResult,
    pub risk_level: RiskLevel,
    pub is_quarantined: bool,
    pub threat_details: Option<ThreatDetails>,
    pub scanned_at: DateTime<Utc>,
    pub email_received_at: DateTime<Utc>,
}

/// First `CONTENT_PREVIEW_CHARS` characters of the content, no padding.
/// Char-wise so multi-byte content never splits a code point.
pub fn content_preview(content: &str) -> String {
    content.chars().take(CONTENT_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_at_200_chars() {
        let long = "x".repeat(250);
        let preview = content_preview(&long);
        assert_eq!(preview.chars().count(), 200);
        assert_eq!(preview, "x".repeat(200));
    }

    #[test]
    fn preview_keeps_short_content_unchanged() {
        assert_eq!(content_preview("short body"), "short body");
        assert_eq!(content_preview(""), "");
    }

    #[test]
    fn preview_exact_boundary() {
        let exact = "y".repeat(200);
        assert_eq!(content_preview(&exact), exact);
    }

    #[test]
    fn preview_counts_chars_not_bytes() {
        let content = "ü".repeat(210);
        let preview = content_preview(&content);
        assert_eq!(preview.chars().count(), 200);
    }

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn scan_result_round_trips_through_str() {
        for result in [
            ScanResult::Clean,
            ScanResult::Spam,
            ScanResult::Phishing,
            ScanResult::Malware,
            ScanResult::Suspicious,
        ] {
            assert_eq!(ScanResult::parse(result.as_str()), Some(result));
        }
        assert_eq!(ScanResult::parse("bogus"), None);
    }

    #[test]
    fn threat_details_serializes_with_type_key() {
        let details = ThreatDetails {
            threat_type: "phishing".to_string(),
            indicators: vec!["suspicious_links".to_string()],
        };
        let json = serde_json::to_string(&details).unwrap();
        assert!(json.contains("\"type\":\"phishing\""));
    }
}
