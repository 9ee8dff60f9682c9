use {
    crate::{
        models::{TransferRequest, TransferResult},
        transfer::error::TransferError,
    },
    async_trait::async_trait,
};

#[async_trait]
pub trait TransferProcessorInterface {
    /// Runs one transfer in its own session and transaction, committing on
    /// success and aborting on any error.
    async fn execute(&self, request: &TransferRequest) -> Result<TransferResult, TransferError>;
}
