use {
    crate::{
        config::LoadConfig,
        error::DuetError,
        models::TransferRequest,
        store::interface::DocumentStore,
        transfer::{
            TransferProcessor, error::TransferError, interface::TransferProcessorInterface,
        },
    },
    rand::{Rng, SeedableRng, seq::IndexedRandom},
    std::{ops::AddAssign, sync::Arc},
    tokio::task::JoinSet,
    tracing::{info, warn},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub committed: usize,
    pub conflicts: usize,
    pub insufficient_funds: usize,
}

impl LoadReport {
    pub fn attempted(&self) -> usize {
        self.committed + self.conflicts + self.insufficient_funds
    }
}

impl AddAssign for LoadReport {
    fn add_assign(&mut self, other: Self) {
        self.committed += other.committed;
        self.conflicts += other.conflicts;
        self.insufficient_funds += other.insufficient_funds;
    }
}

async fn total_funds<S: DocumentStore>(store: &S, collection: &str) -> Result<i64, DuetError> {
    Ok(store
        .find_all(collection)
        .await?
        .iter()
        .map(|account| account.balance())
        .sum())
}

/// Hammers the collection with random transfers from `config.workers`
/// concurrent workers and checks that no funds were created or lost.
pub async fn run_load<S>(
    store: S,
    collection: &str,
    config: &LoadConfig,
) -> Result<LoadReport, DuetError>
where
    S: DocumentStore + Clone + 'static,
{
    if config.max_amount < 1 {
        return Err(DuetError::InvalidConfig(format!(
            "load.max_amount must be at least 1, got {}",
            config.max_amount
        )));
    }

    let names: Vec<String> = store
        .find_all(collection)
        .await?
        .into_iter()
        .map(|account| account.name)
        .collect();
    if names.len() < 2 {
        return Err(DuetError::InvalidConfig(
            "load generation needs at least two accounts".to_string(),
        ));
    }

    let before = total_funds(&store, collection).await?;
    let processor = Arc::new(TransferProcessor::new(store.clone(), collection));
    let names = Arc::new(names);

    info!("Starting load generator with {} workers...", config.workers);

    let mut workers = JoinSet::new();
    for worker_id in 0..config.workers {
        workers.spawn(run_worker(
            worker_id,
            Arc::clone(&processor),
            Arc::clone(&names),
            config.iterations,
            config.max_amount,
        ));
    }

    let mut report = LoadReport::default();
    while let Some(result) = workers.join_next().await {
        report += result??;
    }

    let after = total_funds(&store, collection).await?;
    if before != after {
        return Err(DuetError::FundsNotConserved { before, after });
    }

    info!(
        "Load finished: {} committed, {} conflicts, {} insufficient funds",
        report.committed, report.conflicts, report.insufficient_funds
    );

    Ok(report)
}

async fn run_worker<S: DocumentStore>(
    worker_id: usize,
    processor: Arc<TransferProcessor<S>>,
    names: Arc<Vec<String>>,
    iterations: usize,
    max_amount: i64,
) -> Result<LoadReport, DuetError> {
    let mut rng = rand::rngs::StdRng::from_os_rng();
    let mut report = LoadReport::default();

    for _ in 0..iterations {
        let request = {
            let pair: Vec<&String> = names.choose_multiple(&mut rng, 2).collect();
            let amount = rng.random_range(1..=max_amount);
            TransferRequest::new(pair[0].clone(), pair[1].clone(), amount)
        };

        match processor.execute(&request).await {
            Ok(_) => report.committed += 1,
            Err(e) if e.is_write_conflict() => report.conflicts += 1,
            Err(TransferError::InsufficientFunds { .. }) => report.insufficient_funds += 1,
            Err(e) => {
                warn!("[Worker {}] Transfer failed: {}", worker_id, e);
                return Err(e.into());
            }
        }

        tokio::task::yield_now().await;
    }

    Ok(report)
}
