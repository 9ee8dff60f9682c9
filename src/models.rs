use std::collections::BTreeMap;

/// Balance pool adjusted when a transfer does not name one.
pub const DEFAULT_FIELD: &str = "balance";

/// An account document. `name` identifies it; every other attribute is a
/// numeric balance pool that can be adjusted independently.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub fields: BTreeMap<String, i64>,
}

impl Account {
    pub fn new(name: impl Into<String>, balance: i64) -> Self {
        Account {
            name: name.into(),
            fields: BTreeMap::from([(DEFAULT_FIELD.to_string(), balance)]),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>, value: i64) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    /// Value of a balance pool. Missing pools read as zero, the same way an
    /// increment on a missing field starts from zero.
    pub fn get(&self, field: &str) -> i64 {
        self.fields.get(field).copied().unwrap_or_default()
    }

    pub fn balance(&self) -> i64 {
        self.get(DEFAULT_FIELD)
    }
}

/// One transfer of `amount` on the `field` pool from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: i64,
    pub field: String,
}

impl TransferRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: i64) -> Self {
        TransferRequest {
            from: from.into(),
            to: to.into(),
            amount,
            field: DEFAULT_FIELD.to_string(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }
}

/// Post-update snapshots of both sides of a transfer, as returned by the
/// store for each write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub from: Account,
    pub to: Account,
}
