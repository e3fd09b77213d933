pub mod config;
pub mod error;
pub mod pipeline;
pub mod quarantine;
pub mod report;
pub mod samples;
pub mod scanner;
pub mod store;
pub mod types;

pub use config::{Config, ThreatRule};
pub use error::TriageError;
pub use pipeline::{BatchReport, TriagePipeline};
pub use quarantine::{QuarantineManager, Transition};
pub use scanner::{should_quarantine, ScanEngine, Verdict};
pub use store::{MemoryStore, MonitorRegistry, ScanStore, SqliteStore};
pub use types::{
    AddressStatus, EmailCandidate, MonitoredAddress, RiskLevel, ScanRecord, ScanResult,
    ThreatDetails,
};
