use thiserror::Error;

/// Input rejected before any state change.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Signature is empty")]
    EmptySignature,

    #[error("Signature slot {0} is out of range (expected 0..{max})", max = crate::models::SIGNATURE_SLOTS)]
    SignatureSlot(usize),

    #[error("Application needs {missing} more signature(s) before approval")]
    MissingSignatures { missing: usize },

    #[error("Unknown month: {0}")]
    UnknownMonth(String),

    #[error("Invalid number for {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Row {0} is not part of this edit session")]
    UnknownRow(usize),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Subscription closed for collection {0}")]
    Closed(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Maximum length for backend messages carried in errors
const MAX_BACKEND_MESSAGE_LENGTH: usize = 500;

impl StoreError {
    /// Wrap a backend message, truncating it to avoid logging excessive data
    pub fn backend(message: &str) -> Self {
        if message.len() <= MAX_BACKEND_MESSAGE_LENGTH {
            StoreError::Backend(message.to_string())
        } else {
            let cut: String = message.chars().take(MAX_BACKEND_MESSAGE_LENGTH).collect();
            StoreError::Backend(format!(
                "{}... (truncated, {} total bytes)",
                cut,
                message.len()
            ))
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, Error>;
