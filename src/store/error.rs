use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("WriteConflict on {collection}/{key}")]
    WriteConflict { collection: String, key: String },
    #[error("Document {key} not found in {collection}")]
    DocumentNotFound { collection: String, key: String },
    #[error("Duplicate key {key} in {collection}")]
    DuplicateKey { collection: String, key: String },
    #[error("Session has no active transaction")]
    NoActiveTransaction,
    #[error("Transaction already in progress")]
    TransactionInProgress,
    #[error("Increment of {field} on {key} overflows")]
    Overflow { key: String, field: String },
    #[error("Failed to acquire store lock")]
    LockPoisoned,
}

impl StoreError {
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, StoreError::WriteConflict { .. })
    }
}
