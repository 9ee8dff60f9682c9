//! Transactional document store used by the transfer operation.
//! `MemoryStore` keeps committed documents in process, serves every
//! transaction from the snapshot taken when it started, and detects write
//! conflicts at document granularity when a transaction commits.

pub mod error;
pub mod interface;

use {
    crate::{
        models::Account,
        store::{
            error::StoreError,
            interface::{DocumentStore, TransactionState},
        },
    },
    async_trait::async_trait,
    dashmap::DashMap,
    std::{
        collections::{BTreeMap, HashMap},
        sync::{
            Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
            atomic::{AtomicU64, Ordering},
        },
    },
    tracing::{debug, info, warn},
    uuid::Uuid,
};

/// Committed versions of one document, oldest first. The last entry is the
/// current one; older entries stay while an open snapshot can still see them.
#[derive(Debug)]
struct Document {
    versions: Vec<(u64, Account)>,
}

impl Document {
    fn new(version: u64, account: Account) -> Self {
        Document {
            versions: vec![(version, account)],
        }
    }

    fn current_version(&self) -> u64 {
        self.versions.last().map(|(v, _)| *v).unwrap_or_default()
    }

    fn visible_at(&self, snapshot: u64) -> Option<&(u64, Account)> {
        self.versions.iter().rev().find(|(v, _)| *v <= snapshot)
    }

    fn push(&mut self, version: u64, account: Account) {
        self.versions.push((version, account));
    }

    /// Drops versions no snapshot at or after `oldest_snapshot` can read.
    fn prune(&mut self, oldest_snapshot: u64) {
        let keep_from = self
            .versions
            .iter()
            .rposition(|(v, _)| *v <= oldest_snapshot)
            .unwrap_or(0);
        self.versions.drain(..keep_from);
    }
}

#[derive(Debug, Default)]
struct Collection {
    order: Vec<String>,
    documents: HashMap<String, Document>,
}

#[derive(Debug, Default)]
struct Inner {
    collections: RwLock<HashMap<String, Collection>>,
    // Last version handed out; a snapshot is the value seen at transaction start.
    last_version: AtomicU64,
    // Snapshots of open transactions, keyed by session.
    active_snapshots: DashMap<Uuid, u64>,
}

/// In-process document store. Clones are additional client handles onto
/// the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct StagedWrite {
    base_version: u64,
    account: Account,
}

#[derive(Debug)]
pub struct MemorySession {
    id: Uuid,
    state: TransactionState,
    snapshot: u64,
    writes: BTreeMap<(String, String), StagedWrite>,
}

impl MemorySession {
    fn ensure_active(&self) -> Result<(), StoreError> {
        match self.state {
            TransactionState::Active => Ok(()),
            _ => Err(StoreError::NoActiveTransaction),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn acquire_read_lock(
        &self,
    ) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>, StoreError> {
        self.inner
            .collections
            .read()
            .map_err(|_| StoreError::LockPoisoned)
    }

    fn acquire_write_lock(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>, StoreError> {
        self.inner
            .collections
            .write()
            .map_err(|_| StoreError::LockPoisoned)
    }

    /// Must be called with the write lock held.
    fn next_version(&self) -> u64 {
        self.inner.last_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn oldest_snapshot(&self) -> Option<u64> {
        self.inner
            .active_snapshots
            .iter()
            .map(|entry| *entry.value())
            .min()
    }

    fn finish(&self, session: &mut MemorySession, state: TransactionState) {
        self.inner.active_snapshots.remove(&session.id);
        session.writes.clear();
        session.state = state;
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    type Session = MemorySession;

    fn start_session(&self) -> MemorySession {
        MemorySession {
            id: Uuid::new_v4(),
            state: TransactionState::NotStarted,
            snapshot: 0,
            writes: BTreeMap::new(),
        }
    }

    fn transaction_state(&self, session: &MemorySession) -> TransactionState {
        session.state
    }

    async fn start_transaction(&self, session: &mut MemorySession) -> Result<(), StoreError> {
        if session.state == TransactionState::Active {
            return Err(StoreError::TransactionInProgress);
        }

        // Holding the read lock keeps commits from interleaving with the
        // snapshot read and its registration.
        {
            let _collections = self.acquire_read_lock()?;
            session.snapshot = self.inner.last_version.load(Ordering::SeqCst);
            self.inner
                .active_snapshots
                .insert(session.id, session.snapshot);
        }

        session.writes.clear();
        session.state = TransactionState::Active;
        debug!(
            "Session {} started a transaction at snapshot {}",
            session.id, session.snapshot
        );
        Ok(())
    }

    async fn commit_transaction(&self, session: &mut MemorySession) -> Result<(), StoreError> {
        session.ensure_active()?;

        let mut collections = match self.acquire_write_lock() {
            Ok(guard) => guard,
            Err(e) => {
                self.finish(session, TransactionState::Aborted);
                return Err(e);
            }
        };

        // First committer wins: any document committed by someone else after
        // this transaction's snapshot fails the whole transaction.
        let conflict = session.writes.iter().find_map(|((collection, key), staged)| {
            let current = collections
                .get(collection)
                .and_then(|c| c.documents.get(key))
                .map(Document::current_version);

            (current != Some(staged.base_version)).then(|| StoreError::WriteConflict {
                collection: collection.clone(),
                key: key.clone(),
            })
        });

        if let Some(err) = conflict {
            warn!("Session {} failed to commit: {}", session.id, err);
            self.finish(session, TransactionState::Aborted);
            return Err(err);
        }

        let writes = std::mem::take(&mut session.writes);
        let count = writes.len();
        self.inner.active_snapshots.remove(&session.id);
        let oldest = self.oldest_snapshot();

        if count > 0 {
            let version = self.next_version();
            for ((collection, key), staged) in writes {
                if let Some(doc) = collections
                    .get_mut(&collection)
                    .and_then(|c| c.documents.get_mut(&key))
                {
                    doc.push(version, staged.account);
                    doc.prune(oldest.unwrap_or(version));
                }
            }
        }

        self.finish(session, TransactionState::Committed);
        info!("Session {} committed {} document(s)", session.id, count);
        Ok(())
    }

    async fn abort_transaction(&self, session: &mut MemorySession) -> Result<(), StoreError> {
        session.ensure_active()?;
        debug!(
            "Session {} aborted, discarding {} staged write(s)",
            session.id,
            session.writes.len()
        );
        self.finish(session, TransactionState::Aborted);
        Ok(())
    }

    async fn end_session(&self, mut session: MemorySession) {
        if session.state == TransactionState::Active {
            self.finish(&mut session, TransactionState::Aborted);
        }
        debug!("Session {} ended", session.id);
    }

    async fn find_one_and_increment(
        &self,
        session: &mut MemorySession,
        collection: &str,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<Account, StoreError> {
        session.ensure_active()?;

        let slot = (collection.to_string(), key.to_string());
        let (base_version, mut account) = match session.writes.get(&slot) {
            Some(staged) => (staged.base_version, staged.account.clone()),
            None => {
                let collections = self.acquire_read_lock()?;
                let (version, account) = collections
                    .get(collection)
                    .and_then(|c| c.documents.get(key))
                    .and_then(|doc| doc.visible_at(session.snapshot))
                    .ok_or_else(|| StoreError::DocumentNotFound {
                        collection: collection.to_string(),
                        key: key.to_string(),
                    })?;
                (*version, account.clone())
            }
        };

        let updated = account
            .get(field)
            .checked_add(delta)
            .ok_or_else(|| StoreError::Overflow {
                key: key.to_string(),
                field: field.to_string(),
            })?;
        account.fields.insert(field.to_string(), updated);

        debug!(
            "Session {} staged {}/{}.{} += {} -> {}",
            session.id, collection, key, field, delta, updated
        );

        session.writes.insert(
            slot,
            StagedWrite {
                base_version,
                account: account.clone(),
            },
        );

        Ok(account)
    }

    async fn find_one(
        &self,
        session: &mut MemorySession,
        collection: &str,
        key: &str,
    ) -> Result<Option<Account>, StoreError> {
        session.ensure_active()?;

        if let Some(staged) = session
            .writes
            .get(&(collection.to_string(), key.to_string()))
        {
            return Ok(Some(staged.account.clone()));
        }

        let collections = self.acquire_read_lock()?;
        Ok(collections
            .get(collection)
            .and_then(|c| c.documents.get(key))
            .and_then(|doc| doc.visible_at(session.snapshot))
            .map(|(_, account)| account.clone()))
    }

    async fn insert_many(
        &self,
        collection: &str,
        accounts: Vec<Account>,
    ) -> Result<(), StoreError> {
        let mut collections = self.acquire_write_lock()?;
        let target = collections.entry(collection.to_string()).or_default();

        for (i, account) in accounts.iter().enumerate() {
            let repeated = accounts[..i].iter().any(|a| a.name == account.name);
            if repeated || target.documents.contains_key(&account.name) {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    key: account.name.clone(),
                });
            }
        }

        let count = accounts.len();
        let version = self.next_version();
        for account in accounts {
            target.order.push(account.name.clone());
            target
                .documents
                .insert(account.name.clone(), Document::new(version, account));
        }

        debug!("Inserted {} document(s) into {}", count, collection);
        Ok(())
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Account>, StoreError> {
        let collections = self.acquire_read_lock()?;

        let Some(target) = collections.get(collection) else {
            return Ok(vec![]);
        };

        Ok(target
            .order
            .iter()
            .filter_map(|name| target.documents.get(name))
            .filter_map(|doc| doc.versions.last())
            .map(|(_, account)| account.clone())
            .collect())
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), StoreError> {
        let mut collections = self.acquire_write_lock()?;
        if collections.remove(collection).is_some() {
            debug!("Dropped collection {}", collection);
        }
        Ok(())
    }
}
