use {
    crate::{
        config::DuetConfig,
        error::DuetError,
        fixtures::seed_accounts,
        load::{LoadReport, run_load},
        models::Account,
        persistence::Persistence,
        scenario::{ScenarioReport, run_scenario},
        store::{MemoryStore, interface::DocumentStore},
    },
    tracing::info,
};

pub mod config;
pub mod error;
pub mod fixtures;
pub mod load;
pub mod logging;
pub mod macros;
pub mod metrics;
pub mod models;
pub mod persistence;
pub mod scenario;
pub mod store;
pub mod transfer;

pub struct Duet {
    pub config: DuetConfig,
    pub store: MemoryStore,
    persistence: Persistence,
}

impl Duet {
    pub fn new(config: DuetConfig) -> Result<Self, DuetError> {
        let persistence = Persistence::new(&config.store.database_path)?;

        Ok(Duet {
            config,
            store: MemoryStore::new(),
            persistence,
        })
    }

    fn collection(&self) -> &str {
        &self.config.store.collection
    }

    /// Fills the store with the saved accounts, or with the configured
    /// fixtures when nothing was saved yet or `reset` is set.
    pub async fn prepare(&self, reset: bool) -> Result<(), DuetError> {
        let saved = if reset {
            vec![]
        } else {
            self.persistence.load_collection(self.collection())?
        };

        let accounts = if saved.is_empty() {
            self.config.fixtures()
        } else {
            saved
        };

        info!(
            "Initializing {} with {} accounts",
            self.collection(),
            accounts.len()
        );
        seed_accounts(&self.store, self.collection(), accounts).await?;

        Ok(())
    }

    pub async fn run_scenario(&self) -> Result<ScenarioReport, DuetError> {
        let requests = self
            .config
            .sessions
            .iter()
            .map(|plan| plan.to_request())
            .collect();

        run_scenario(self.store.clone(), self.collection(), requests).await
    }

    pub async fn run_load(&self) -> Result<LoadReport, DuetError> {
        run_load(self.store.clone(), self.collection(), &self.config.load).await
    }

    pub async fn accounts(&self) -> Result<Vec<Account>, DuetError> {
        Ok(self.store.find_all(self.collection()).await?)
    }

    /// Writes the committed accounts to the SQLite snapshot.
    pub async fn save(&mut self) -> Result<(), DuetError> {
        let accounts = self.accounts().await?;
        let collection = self.config.store.collection.clone();
        self.persistence.save_collection(&collection, &accounts)?;

        info!("State saved successfully");
        Ok(())
    }
}
