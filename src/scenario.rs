//! Concurrent session scenario: every plan runs in its own session and
//! transaction, all sessions stage their transfer before any of them
//! commits, so overlapping transfers race at commit time.

use {
    crate::{
        error::DuetError,
        metrics::TRANSFERS_STAGED_TOTAL,
        models::{Account, TransferRequest, TransferResult},
        store::interface::DocumentStore,
        transfer::{error::TransferError, record_outcome, transfer},
    },
    tokio::{
        sync::{mpsc, watch},
        task::JoinSet,
    },
    tracing::{debug, info},
};

#[derive(Debug)]
pub struct SessionOutcome {
    pub index: usize,
    pub request: TransferRequest,
    pub result: Result<TransferResult, TransferError>,
}

impl SessionOutcome {
    pub fn committed(&self) -> bool {
        self.result.is_ok()
    }

    pub fn conflicted(&self) -> bool {
        matches!(&self.result, Err(e) if e.is_write_conflict())
    }
}

#[derive(Debug)]
pub struct ScenarioReport {
    /// One outcome per plan, in plan order.
    pub outcomes: Vec<SessionOutcome>,
    /// Committed account documents after every session finished.
    pub accounts: Vec<Account>,
}

impl ScenarioReport {
    pub fn committed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.committed()).count()
    }

    pub fn conflicted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.conflicted()).count()
    }
}

pub async fn run_scenario<S>(
    store: S,
    collection: &str,
    requests: Vec<TransferRequest>,
) -> Result<ScenarioReport, DuetError>
where
    S: DocumentStore + Clone + 'static,
{
    let count = requests.len();
    // A session reports staged by sending, or by dropping its sender if it
    // never gets that far (a panicked task drops it while unwinding).
    let (staged_tx, mut staged_rx) = mpsc::channel::<usize>(count.max(1));
    let (commit_tx, commit_rx) = watch::channel(false);
    let mut sessions = JoinSet::new();

    for (index, request) in requests.into_iter().enumerate() {
        let store = store.clone();
        let collection = collection.to_string();
        let gate = CommitGate {
            staged: staged_tx.clone(),
            commit: commit_rx.clone(),
        };
        sessions.spawn(async move {
            let result = run_session(&store, &collection, &request, index, gate).await;
            record_outcome(&request, &result);
            SessionOutcome {
                index,
                request,
                result,
            }
        });
    }
    drop(staged_tx);

    let mut staged = 0;
    while staged < count && staged_rx.recv().await.is_some() {
        staged += 1;
    }
    debug!("{} of {} session(s) staged, releasing commits", staged, count);
    let _ = commit_tx.send(true);

    let mut outcomes = Vec::new();
    while let Some(outcome) = sessions.join_next().await {
        outcomes.push(outcome?);
    }
    outcomes.sort_by_key(|o| o.index);

    info!(
        "Scenario finished: {} committed, {} conflicted, {} session(s)",
        outcomes.iter().filter(|o| o.committed()).count(),
        outcomes.iter().filter(|o| o.conflicted()).count(),
        outcomes.len()
    );

    let accounts = store.find_all(collection).await?;

    Ok(ScenarioReport { outcomes, accounts })
}

/// Holds a session back from committing until every session has staged.
struct CommitGate {
    staged: mpsc::Sender<usize>,
    commit: watch::Receiver<bool>,
}

impl CommitGate {
    async fn staged_then_wait(mut self, index: usize) {
        let _ = self.staged.send(index).await;
        drop(self.staged);
        let _ = self.commit.wait_for(|go| *go).await;
    }
}

async fn run_session<S: DocumentStore>(
    store: &S,
    collection: &str,
    request: &TransferRequest,
    index: usize,
    gate: CommitGate,
) -> Result<TransferResult, TransferError> {
    let mut session = store.start_session();

    let staged = match store.start_transaction(&mut session).await {
        Ok(()) => transfer(store, &mut session, collection, request).await,
        Err(e) => Err(e.into()),
    };
    if staged.is_ok() {
        TRANSFERS_STAGED_TOTAL.inc();
    }

    // Every session stages before anyone commits.
    gate.staged_then_wait(index).await;

    let outcome = match staged {
        Ok(result) => store
            .commit_transaction(&mut session)
            .await
            .map(|()| result)
            .map_err(TransferError::from),
        Err(e) => Err(e),
    };

    // Ending the session aborts whatever is still staged.
    store.end_session(session).await;
    outcome
}
