use duet::{
    fixtures::{balances, seed_accounts},
    models::{Account, TransferRequest},
    scenario::run_scenario,
    store::{
        MemoryStore,
        error::StoreError,
        interface::{DocumentStore, TransactionState},
    },
    transfer::{error::TransferError, transfer},
};

const ACCOUNTS: &str = "Account";

async fn setup(accounts: Vec<Account>) -> MemoryStore {
    let store = MemoryStore::new();
    seed_accounts(&store, ACCOUNTS, accounts)
        .await
        .expect("seed accounts");
    store
}

fn pairs(expected: &[(&str, i64)]) -> Vec<(String, i64)> {
    expected
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
}

/// Stages `first` and `second` in two sessions, then commits them in order.
/// Returns the commit results.
async fn stage_both_then_commit(
    first_store: &MemoryStore,
    second_store: &MemoryStore,
    first: TransferRequest,
    second: TransferRequest,
) -> (Result<(), StoreError>, Result<(), StoreError>) {
    let mut session_first = first_store.start_session();
    first_store
        .start_transaction(&mut session_first)
        .await
        .expect("start first");

    let mut session_second = second_store.start_session();
    second_store
        .start_transaction(&mut session_second)
        .await
        .expect("start second");

    transfer(first_store, &mut session_first, ACCOUNTS, &first)
        .await
        .expect("stage first");
    transfer(second_store, &mut session_second, ACCOUNTS, &second)
        .await
        .expect("stage second");

    let first_commit = first_store.commit_transaction(&mut session_first).await;
    let second_commit = second_store.commit_transaction(&mut session_second).await;

    first_store.end_session(session_first).await;
    second_store.end_session(session_second).await;

    (first_commit, second_commit)
}

#[tokio::test]
async fn test_disjoint_transfers_both_commit() {
    let store = setup(vec![
        Account::new("A", 5),
        Account::new("B", 10),
        Account::new("C", 5),
        Account::new("D", 10),
    ])
    .await;

    let (first, second) = stage_both_then_commit(
        &store,
        &store,
        TransferRequest::new("A", "B", 2),
        TransferRequest::new("C", "D", 5),
    )
    .await;

    assert_eq!(first, Ok(()));
    assert_eq!(second, Ok(()));
    assert_eq!(
        balances(&store, ACCOUNTS, "balance").await.unwrap(),
        pairs(&[("A", 3), ("B", 12), ("C", 0), ("D", 15)])
    );
}

#[tokio::test]
async fn test_opposite_direction_transfers_conflict() {
    let store = setup(vec![Account::new("A", 5), Account::new("B", 10)]).await;

    let (first, second) = stage_both_then_commit(
        &store,
        &store,
        TransferRequest::new("B", "A", 2),
        TransferRequest::new("A", "B", 5),
    )
    .await;

    assert_eq!(first, Ok(()));
    assert!(second.unwrap_err().is_write_conflict());

    // Only the first transaction is reflected.
    assert_eq!(
        balances(&store, ACCOUNTS, "balance").await.unwrap(),
        pairs(&[("A", 7), ("B", 8)])
    );
}

#[tokio::test]
async fn test_shared_account_conflicts() {
    let store = setup(vec![
        Account::new("A", 5),
        Account::new("B", 10),
        Account::new("C", 8),
    ])
    .await;

    let (first, second) = stage_both_then_commit(
        &store,
        &store,
        TransferRequest::new("A", "B", 2),
        TransferRequest::new("C", "A", 7),
    )
    .await;

    assert_eq!(first, Ok(()));
    assert_eq!(
        second,
        Err(StoreError::WriteConflict {
            collection: ACCOUNTS.to_string(),
            key: "A".to_string(),
        })
    );
    assert_eq!(
        balances(&store, ACCOUNTS, "balance").await.unwrap(),
        pairs(&[("A", 3), ("B", 12), ("C", 8)])
    );
}

#[tokio::test]
async fn test_different_fields_of_same_account_still_conflict() {
    let store = setup(vec![
        Account::new("A", 5).with_field("reserve", 10),
        Account::new("B", 10).with_field("reserve", 5),
        Account::new("C", 8).with_field("reserve", 9),
    ])
    .await;

    let (first, second) = stage_both_then_commit(
        &store,
        &store,
        TransferRequest::new("A", "B", 2),
        TransferRequest::new("C", "A", 7).with_field("reserve"),
    )
    .await;

    assert_eq!(first, Ok(()));
    assert!(second.unwrap_err().is_write_conflict());
    assert_eq!(
        balances(&store, ACCOUNTS, "reserve").await.unwrap(),
        pairs(&[("A", 10), ("B", 5), ("C", 9)])
    );
}

#[tokio::test]
async fn test_conflict_detected_across_client_handles() {
    let store = setup(vec![
        Account::new("A", 5),
        Account::new("B", 10),
        Account::new("C", 8),
    ])
    .await;
    let client_first = store.clone();
    let client_second = store.clone();

    let (first, second) = stage_both_then_commit(
        &client_first,
        &client_second,
        TransferRequest::new("A", "B", 2),
        TransferRequest::new("C", "A", 7),
    )
    .await;

    assert_eq!(first, Ok(()));
    assert!(second.unwrap_err().is_write_conflict());
}

#[tokio::test]
async fn test_insufficient_funds_leaves_balances_untouched_after_abort() {
    let store = setup(vec![Account::new("A", 1), Account::new("B", 10)]).await;

    let mut session = store.start_session();
    store.start_transaction(&mut session).await.unwrap();

    let err = transfer(&store, &mut session, ACCOUNTS, &TransferRequest::new("A", "B", 5))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransferError::InsufficientFunds { balance: 1, .. }
    ));

    store.abort_transaction(&mut session).await.unwrap();
    assert_eq!(store.transaction_state(&session), TransactionState::Aborted);
    store.end_session(session).await;

    assert_eq!(
        balances(&store, ACCOUNTS, "balance").await.unwrap(),
        pairs(&[("A", 1), ("B", 10)])
    );
}

#[tokio::test]
async fn test_returned_snapshots_match_fresh_reads() {
    let store = setup(vec![Account::new("A", 5), Account::new("B", 10)]).await;

    let mut session = store.start_session();
    store.start_transaction(&mut session).await.unwrap();

    let result = transfer(&store, &mut session, ACCOUNTS, &TransferRequest::new("A", "B", 2))
        .await
        .unwrap();

    assert_eq!(
        store.find_one(&mut session, ACCOUNTS, "A").await.unwrap(),
        Some(result.from.clone())
    );
    assert_eq!(
        store.find_one(&mut session, ACCOUNTS, "B").await.unwrap(),
        Some(result.to.clone())
    );

    store.commit_transaction(&mut session).await.unwrap();
    let committed = store.find_all(ACCOUNTS).await.unwrap();
    assert_eq!(committed, vec![result.from, result.to]);
}

#[tokio::test]
async fn test_two_transfers_in_one_transaction_commit_together() {
    let store = setup(vec![
        Account::new("A", 5),
        Account::new("B", 10),
        Account::new("C", 8),
    ])
    .await;

    let mut session = store.start_session();
    store.start_transaction(&mut session).await.unwrap();

    transfer(&store, &mut session, ACCOUNTS, &TransferRequest::new("A", "B", 2))
        .await
        .unwrap();
    let result = transfer(&store, &mut session, ACCOUNTS, &TransferRequest::new("B", "C", 12))
        .await
        .unwrap();

    // The second transfer sees the first one's staged credit.
    assert_eq!(result.from.balance(), 0);

    store.commit_transaction(&mut session).await.unwrap();
    assert_eq!(
        balances(&store, ACCOUNTS, "balance").await.unwrap(),
        pairs(&[("A", 3), ("B", 0), ("C", 20)])
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scenario_commits_exactly_one_of_overlapping_sessions() {
    let store = setup(vec![Account::new("A", 5), Account::new("B", 10)]).await;

    let report = run_scenario(
        store.clone(),
        ACCOUNTS,
        vec![
            TransferRequest::new("B", "A", 2),
            TransferRequest::new("A", "B", 5),
        ],
    )
    .await
    .unwrap();

    assert_eq!(report.committed(), 1);
    assert_eq!(report.conflicted(), 1);

    let expected = if report.outcomes[0].committed() {
        pairs(&[("A", 7), ("B", 8)])
    } else {
        pairs(&[("A", 0), ("B", 15)])
    };
    assert_eq!(balances(&store, ACCOUNTS, "balance").await.unwrap(), expected);
}

#[tokio::test]
async fn test_scenario_reports_insufficient_funds_without_committing() {
    let store = setup(vec![
        Account::new("A", 1),
        Account::new("B", 10),
        Account::new("C", 5),
        Account::new("D", 10),
    ])
    .await;

    let report = run_scenario(
        store.clone(),
        ACCOUNTS,
        vec![
            TransferRequest::new("A", "B", 5),
            TransferRequest::new("C", "D", 5),
        ],
    )
    .await
    .unwrap();

    assert!(matches!(
        report.outcomes[0].result,
        Err(TransferError::InsufficientFunds { balance: 1, .. })
    ));
    assert!(report.outcomes[1].committed());
    assert_eq!(
        balances(&store, ACCOUNTS, "balance").await.unwrap(),
        pairs(&[("A", 1), ("B", 10), ("C", 0), ("D", 15)])
    );
}

#[tokio::test]
async fn test_open_transaction_keeps_its_snapshot_and_conflicts() {
    let store = setup(vec![
        Account::new("A", 5),
        Account::new("B", 10),
        Account::new("C", 10),
    ])
    .await;

    let mut s1 = store.start_session();
    let mut s2 = store.start_session();
    store.start_transaction(&mut s1).await.expect("start s1");
    store.start_transaction(&mut s2).await.expect("start s2");

    let before = store.find_one(&mut s2, ACCOUNTS, "A").await.expect("read A");
    assert_eq!(before.map(|a| a.balance()), Some(5));

    transfer(&store, &mut s1, ACCOUNTS, &TransferRequest::new("A", "B", 2))
        .await
        .expect("stage s1");
    store.commit_transaction(&mut s1).await.expect("commit s1");

    // s1's commit is not visible inside s2's transaction.
    let again = store.find_one(&mut s2, ACCOUNTS, "A").await.expect("reread A");
    assert_eq!(again.map(|a| a.balance()), Some(5));

    let staged = transfer(&store, &mut s2, ACCOUNTS, &TransferRequest::new("C", "A", 7))
        .await
        .expect("stage s2");
    assert_eq!(staged.to.balance(), 12);

    let err = store.commit_transaction(&mut s2).await.unwrap_err();
    assert_eq!(
        err,
        StoreError::WriteConflict {
            collection: ACCOUNTS.to_string(),
            key: "A".to_string(),
        }
    );
    assert_eq!(store.transaction_state(&s2), TransactionState::Aborted);

    store.end_session(s1).await;
    store.end_session(s2).await;

    assert_eq!(
        balances(&store, ACCOUNTS, "balance").await.expect("balances"),
        pairs(&[("A", 3), ("B", 12), ("C", 10)])
    );
}
