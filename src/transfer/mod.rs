//! Fund transfers between account documents.
//! `transfer` stages a debit and a credit inside a caller-owned transaction;
//! `TransferProcessor` owns the whole transaction for callers that do not
//! need to group several transfers.

pub mod error;
pub mod interface;

use {
    crate::{
        measure,
        metrics::{
            INSUFFICIENT_FUNDS_TOTAL, TRANSFER_TIME_SECONDS, TRANSFERS_COMMITTED_TOTAL,
            TRANSFERS_STAGED_TOTAL, WRITE_CONFLICTS_TOTAL,
        },
        models::{TransferRequest, TransferResult},
        store::interface::DocumentStore,
        transfer::{error::TransferError, interface::TransferProcessorInterface},
    },
    async_trait::async_trait,
    tracing::{debug, error, info, warn},
};

/// Moves `request.amount` of `request.field` from `request.from` to
/// `request.to` within the session's active transaction.
///
/// The source is decremented first and validated afterwards; when the
/// result is negative the credit is never issued and
/// `TransferError::InsufficientFunds` is returned. The decrement stays
/// staged, so the caller must abort the transaction on any error.
/// Write conflicts only surface when the caller commits.
pub async fn transfer<S: DocumentStore + ?Sized>(
    store: &S,
    session: &mut S::Session,
    collection: &str,
    request: &TransferRequest,
) -> Result<TransferResult, TransferError> {
    if request.amount <= 0 {
        return Err(TransferError::InvalidAmount(request.amount));
    }
    if request.from == request.to {
        return Err(TransferError::SameAccount(request.from.clone()));
    }

    let from = store
        .find_one_and_increment(
            session,
            collection,
            &request.from,
            &request.field,
            -request.amount,
        )
        .await?;

    let remaining = from.get(&request.field);
    if remaining < 0 {
        return Err(TransferError::InsufficientFunds {
            account: request.from.clone(),
            field: request.field.clone(),
            balance: remaining + request.amount,
        });
    }

    let to = store
        .find_one_and_increment(
            session,
            collection,
            &request.to,
            &request.field,
            request.amount,
        )
        .await?;

    debug!(
        "Staged transfer of {} {} from {} to {}",
        request.amount, request.field, request.from, request.to
    );

    Ok(TransferResult { from, to })
}

/// Counts a finished transfer by outcome and logs it. Every path that
/// commits or abandons a transfer transaction reports through here.
pub(crate) fn record_outcome(
    request: &TransferRequest,
    outcome: &Result<TransferResult, TransferError>,
) {
    match outcome {
        Ok(_) => {
            TRANSFERS_COMMITTED_TOTAL.inc();
            info!(
                "Transferred {} {} from {} to {}",
                request.amount, request.field, request.from, request.to
            );
        }
        Err(e) if e.is_write_conflict() => {
            WRITE_CONFLICTS_TOTAL.inc();
            warn!("Transfer from {} to {} rejected: {}", request.from, request.to, e);
        }
        Err(e @ TransferError::InsufficientFunds { .. }) => {
            INSUFFICIENT_FUNDS_TOTAL.inc();
            warn!("Transfer from {} to {} rejected: {}", request.from, request.to, e);
        }
        Err(e) => {
            error!("Transfer from {} to {} failed: {}", request.from, request.to, e);
        }
    }
}

pub struct TransferProcessor<S: DocumentStore> {
    store: S,
    collection: String,
}

impl<S: DocumentStore> TransferProcessor<S> {
    pub fn new(store: S, collection: impl Into<String>) -> Self {
        TransferProcessor {
            store,
            collection: collection.into(),
        }
    }

    async fn run_in_transaction(
        &self,
        session: &mut S::Session,
        request: &TransferRequest,
    ) -> Result<TransferResult, TransferError> {
        self.store.start_transaction(session).await?;

        let staged = transfer(&self.store, session, &self.collection, request).await;

        let result = match staged {
            Ok(result) => result,
            Err(e) => {
                if let Err(abort_err) = self.store.abort_transaction(session).await {
                    error!("Failed to abort transaction after {}: {}", e, abort_err);
                }
                return Err(e);
            }
        };
        TRANSFERS_STAGED_TOTAL.inc();

        self.store.commit_transaction(session).await?;
        Ok(result)
    }
}

#[async_trait]
impl<S: DocumentStore> TransferProcessorInterface for TransferProcessor<S> {
    async fn execute(&self, request: &TransferRequest) -> Result<TransferResult, TransferError> {
        let mut session = self.store.start_session();

        let outcome = measure!(TRANSFER_TIME_SECONDS, {
            self.run_in_transaction(&mut session, request).await
        });

        self.store.end_session(session).await;

        record_outcome(request, &outcome);

        outcome
    }
}
