use {
    crate::{persistence::PersistenceError, store::error::StoreError, transfer::error::TransferError},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum DuetError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Funds not conserved: {before} before, {after} after")]
    FundsNotConserved { before: i64, after: i64 },
}
