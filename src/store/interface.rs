use {
    crate::{models::Account, store::error::StoreError},
    async_trait::async_trait,
};

/// Lifecycle of the transaction currently owned by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    NotStarted,
    Active,
    Committed,
    Aborted,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Caller-owned transactional context. Every read and write tagged with
    /// a session stays invisible to other sessions until it commits.
    type Session: Send;

    /// Opens a session with no transaction started.
    fn start_session(&self) -> Self::Session;

    /// State of the session's current (or last) transaction.
    fn transaction_state(&self, session: &Self::Session) -> TransactionState;

    async fn start_transaction(&self, session: &mut Self::Session) -> Result<(), StoreError>;

    /// Makes every staged write durable and visible, or fails with
    /// `StoreError::WriteConflict` if another transaction committed a change
    /// to any touched document first. A failed commit discards the whole
    /// transaction.
    async fn commit_transaction(&self, session: &mut Self::Session) -> Result<(), StoreError>;

    async fn abort_transaction(&self, session: &mut Self::Session) -> Result<(), StoreError>;

    /// Releases the session, aborting its transaction if still active.
    async fn end_session(&self, session: Self::Session);

    /// Atomically adds `delta` to `field` of the document keyed by `key`
    /// and returns the document as it is after the update.
    async fn find_one_and_increment(
        &self,
        session: &mut Self::Session,
        collection: &str,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<Account, StoreError>;

    /// Reads a document as the session's transaction sees it.
    async fn find_one(
        &self,
        session: &mut Self::Session,
        collection: &str,
        key: &str,
    ) -> Result<Option<Account>, StoreError>;

    /// Inserts committed documents outside any transaction.
    async fn insert_many(
        &self,
        collection: &str,
        accounts: Vec<Account>,
    ) -> Result<(), StoreError>;

    /// Committed documents in insertion order.
    async fn find_all(&self, collection: &str) -> Result<Vec<Account>, StoreError>;

    async fn drop_collection(&self, collection: &str) -> Result<(), StoreError>;
}
