use hms_types::TextError;
use hms_uuid::UuidError;

#[derive(Debug, thiserror::Error)]
pub enum HmsError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Doctor is already booked for this time slot")]
    AlreadyBooked,
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to remove record: {0}")]
    FileRemove(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
    #[error("store lock poisoned")]
    LockPoisoned,
    #[error("failed to initialise token signer: {0}")]
    SignerInit(String),
}

impl HmsError {
    pub fn not_found(entity: &str) -> Self {
        HmsError::NotFound(format!("{} not found", entity))
    }
}

impl From<TextError> for HmsError {
    fn from(err: TextError) -> Self {
        HmsError::InvalidInput(err.to_string())
    }
}

impl From<UuidError> for HmsError {
    fn from(err: UuidError) -> Self {
        HmsError::InvalidInput(err.to_string())
    }
}

pub type HmsResult<T> = std::result::Result<T, HmsError>;
