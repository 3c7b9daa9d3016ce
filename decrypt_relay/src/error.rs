use thiserror::Error;

pub type Result<T, E = RelayError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not retrieve secret {secret_id}: {reason}")]
    KeyRetrieval { secret_id: String, reason: String },

    #[error("could not parse private key: {0}")]
    KeyFormat(String),

    #[error("malformed notification record: {0}")]
    MalformedRecord(String),

    #[error("object {location}/{identifier} not found")]
    ObjectNotFound { location: String, identifier: String },

    #[error("storage access failed for {location}/{identifier}: {reason}")]
    StorageAccess {
        location: String,
        identifier: String,
        reason: String,
    },

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("plaintext of {len} bytes exceeds the {max} byte OAEP limit")]
    PlaintextTooLarge { len: usize, max: usize },
}

impl RelayError {
    pub fn storage_access(location: &str, identifier: &str, reason: impl ToString) -> Self {
        RelayError::StorageAccess {
            location: location.to_string(),
            identifier: identifier.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Errors that end the invocation before any record is touched.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RelayError::Config(_) | RelayError::KeyRetrieval { .. } | RelayError::KeyFormat(_)
        )
    }
}
