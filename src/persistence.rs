use {
    crate::models::Account,
    rusqlite::{Connection, params},
    std::collections::BTreeMap,
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to encode fields of account {name}: {source}")]
    Encode {
        name: String,
        source: serde_json::Error,
    },
    #[error("Failed to decode fields of account {name}: {source}")]
    Decode {
        name: String,
        source: serde_json::Error,
    },
}

/// SQLite snapshot of committed account documents.
pub struct Persistence {
    conn: Connection,
}

impl Persistence {
    pub fn new(db_path: &str) -> Result<Self, PersistenceError> {
        let conn = Connection::open(db_path)?;
        let persistence = Persistence { conn };
        persistence.init_db()?;
        Ok(persistence)
    }

    fn init_db(&self) -> Result<(), PersistenceError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                collection TEXT NOT NULL,
                name TEXT NOT NULL,
                position INTEGER NOT NULL,
                fields TEXT NOT NULL,
                PRIMARY KEY (collection, name)
            )",
            [],
        )?;
        Ok(())
    }

    pub fn save_collection(
        &mut self,
        collection: &str,
        accounts: &[Account],
    ) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM accounts WHERE collection = ?1",
            params![collection],
        )?;

        for (position, account) in accounts.iter().enumerate() {
            let fields =
                serde_json::to_string(&account.fields).map_err(|source| PersistenceError::Encode {
                    name: account.name.clone(),
                    source,
                })?;

            tx.execute(
                "INSERT INTO accounts (collection, name, position, fields) VALUES (?1, ?2, ?3, ?4)",
                params![collection, account.name, position as i64, fields],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn load_collection(&self, collection: &str) -> Result<Vec<Account>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, fields FROM accounts WHERE collection = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![collection], |row| {
            let name: String = row.get(0)?;
            let fields: String = row.get(1)?;
            Ok((name, fields))
        })?;

        let mut accounts = Vec::new();
        for row in rows {
            let (name, fields) = row?;
            let fields: BTreeMap<String, i64> = serde_json::from_str(&fields)
                .map_err(|source| PersistenceError::Decode {
                    name: name.clone(),
                    source,
                })?;
            accounts.push(Account { name, fields });
        }

        Ok(accounts)
    }
}
