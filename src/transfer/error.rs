use {crate::store::error::StoreError, thiserror::Error};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Carries the balance the source held before the decrement.
    #[error("Insufficient funds: {balance}")]
    InsufficientFunds {
        account: String,
        field: String,
        balance: i64,
    },
    #[error("Transfer amount must be positive, got {0}")]
    InvalidAmount(i64),
    #[error("Cannot transfer from account {0} to itself")]
    SameAccount(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl TransferError {
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, TransferError::Store(e) if e.is_write_conflict())
    }
}
