use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TriageError {
    /// The ingestion target is not registered or not active. Nothing is
    /// scanned or stored when this fires.
    #[error("address {address} is not monitored for owner {owner_id}")]
    AddressNotMonitored { address: String, owner_id: String },

    /// The message was scanned before; re-ingesting it is a skip, not a
    /// second record.
    #[error("message {message_id} has already been scanned")]
    DuplicateMessage { message_id: String },

    #[error("no scan record with id {id}")]
    RecordNotFound { id: Uuid },

    #[error("{address} is not a valid email address")]
    InvalidAddress { address: String },

    #[error("address {address} is already monitored")]
    DuplicateAddress { address: String },

    /// Collaborator failure. Retryable; never swallowed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for TriageError {
    fn from(err: rusqlite::Error) -> Self {
        TriageError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TriageError>;
