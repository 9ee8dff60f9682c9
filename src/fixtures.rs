use {
    crate::{
        measure,
        metrics::FIXTURE_SEED_TIME_SECONDS,
        models::Account,
        store::{error::StoreError, interface::DocumentStore},
    },
    tracing::info,
};

/// Replaces the collection's contents with `accounts`.
pub async fn seed_accounts<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    accounts: Vec<Account>,
) -> Result<(), StoreError> {
    let count = accounts.len();
    measure!(FIXTURE_SEED_TIME_SECONDS, {
        store.drop_collection(collection).await?;
        store.insert_many(collection, accounts).await?;
    });
    info!("Seeded {} account(s) into {}", count, collection);
    Ok(())
}

/// Committed `(name, value)` pairs of one balance pool, in insertion order.
pub async fn balances<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    field: &str,
) -> Result<Vec<(String, i64)>, StoreError> {
    Ok(store
        .find_all(collection)
        .await?
        .into_iter()
        .map(|account| {
            let value = account.get(field);
            (account.name, value)
        })
        .collect())
}
