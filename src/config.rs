use {
    crate::models::{Account, DEFAULT_FIELD, TransferRequest},
    config::{Config, ConfigError, File, FileFormat},
    std::collections::BTreeMap,
};

#[derive(Clone, Debug, serde::Deserialize)]
pub struct DuetConfig {
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub accounts: Vec<AccountFixture>,
    #[serde(default)]
    pub sessions: Vec<SessionPlan>,
    #[serde(default)]
    pub load: LoadConfig,
}

impl DuetConfig {
    pub fn from_file(config_path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder().add_source(File::new(config_path, FileFormat::Toml));

        let config: DuetConfig = builder.build()?.try_deserialize()?;

        Ok(config)
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder().add_source(File::from_str(source, FileFormat::Toml));

        builder.build()?.try_deserialize()
    }

    pub fn fixtures(&self) -> Vec<Account> {
        self.accounts.iter().map(AccountFixture::to_account).collect()
    }
}

fn default_log_dir() -> String {
    "logs".to_string()
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct StoreConfig {
    pub collection: String,
    pub database_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            collection: "Account".to_string(),
            database_path: "duet.db".to_string(),
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct AccountFixture {
    pub name: String,
    #[serde(default)]
    pub balance: i64,
    /// Extra balance pools, e.g. `reserve`.
    #[serde(default)]
    pub pools: BTreeMap<String, i64>,
}

impl AccountFixture {
    pub fn to_account(&self) -> Account {
        self.pools.iter().fold(
            Account::new(self.name.clone(), self.balance),
            |account, (field, value)| account.with_field(field.clone(), *value),
        )
    }
}

/// One session of the scenario run: a single transfer staged in its own
/// transaction.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct SessionPlan {
    pub from: String,
    pub to: String,
    pub amount: i64,
    #[serde(default = "default_field")]
    pub field: String,
}

impl SessionPlan {
    pub fn to_request(&self) -> TransferRequest {
        TransferRequest::new(self.from.clone(), self.to.clone(), self.amount)
            .with_field(self.field.clone())
    }
}

fn default_field() -> String {
    DEFAULT_FIELD.to_string()
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct LoadConfig {
    pub workers: usize,
    pub iterations: usize,
    pub max_amount: i64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            workers: 4,
            iterations: 100,
            max_amount: 5,
        }
    }
}
