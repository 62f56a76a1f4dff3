//! Destination changes, full sweeps and concurrent transitions

use namehist_core::{render, ChannelId, UserId};
use namehist_store::RecordStore;
use namehist_sync::prelude::*;
use namehist_test_utils::{memory_ledger, seed_records, RecordingSink};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn test_sweep_isolates_single_failure() {
    let (ledger, store, sink) =
        memory_ledger(LedgerSettings::new().with_resync_concurrency(8));
    seed_records(store.as_ref(), 500).await.unwrap();
    sink.fail_creates_for(UserId(250));

    let report = ledger.set_destination(ChannelId(77)).await.unwrap();

    assert_eq!(report.destination, Some(ChannelId(77)));
    assert_eq!(report.total, 500);
    assert_eq!(report.created, 499);
    assert_eq!(report.reconciled(), 499);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].user_id, UserId(250));
    assert!(report.failures[0].error.history_persisted());

    assert_eq!(sink.messages_in(ChannelId(77)).len(), 499);
    let failed = store.get(UserId(250)).await.unwrap().unwrap();
    assert_eq!(failed.artifact_ref, None);
    assert_eq!(store.destination().await.unwrap(), Some(ChannelId(77)));
}

#[tokio::test]
async fn test_sweep_content_matches_records() {
    let (ledger, store, sink) = memory_ledger(LedgerSettings::new());
    seed_records(store.as_ref(), 25).await.unwrap();

    ledger.set_destination(ChannelId(5)).await.unwrap();

    for record in store.all().await.unwrap() {
        let handle = record.artifact_ref.unwrap();
        assert!(handle.is_in(ChannelId(5)));
        assert_eq!(sink.message(handle).unwrap(), render(&record));
    }
}

#[tokio::test]
async fn test_destination_change_retargets_messages() {
    let (ledger, store, sink) = memory_ledger(LedgerSettings::new());
    seed_records(store.as_ref(), 10).await.unwrap();

    let first = ledger.set_destination(ChannelId(1)).await.unwrap();
    assert_eq!(first.created, 10);

    let second = ledger.set_destination(ChannelId(2)).await.unwrap();
    assert_eq!(second.recreated, 10);
    assert!(second.is_clean());

    for record in store.all().await.unwrap() {
        assert!(record.artifact_ref.unwrap().is_in(ChannelId(2)));
        assert_eq!(sink.messages_for(ChannelId(2), record.user_id).len(), 1);
    }
    // Messages in the previous channel are left alone.
    assert_eq!(sink.messages_in(ChannelId(1)).len(), 10);
}

#[tokio::test]
async fn test_repeated_set_destination_does_not_duplicate() {
    let (ledger, store, sink) = memory_ledger(LedgerSettings::new());
    seed_records(store.as_ref(), 3).await.unwrap();

    ledger.set_destination(ChannelId(9)).await.unwrap();
    let again = ledger.set_destination(ChannelId(9)).await.unwrap();

    assert_eq!(again.edited, 3);
    assert_eq!(again.created, 0);
    assert_eq!(sink.messages_in(ChannelId(9)).len(), 3);
}

#[tokio::test]
async fn test_sweep_recovers_deleted_messages() {
    let (ledger, store, sink) = memory_ledger(LedgerSettings::new());
    seed_records(store.as_ref(), 4).await.unwrap();
    ledger.set_destination(ChannelId(3)).await.unwrap();

    let victim = store.get(UserId(2)).await.unwrap().unwrap();
    sink.delete(victim.artifact_ref.unwrap());

    let report = ledger.resync().await.unwrap();
    assert_eq!(report.recreated, 1);
    assert_eq!(report.edited, 3);
    assert_eq!(sink.messages_for(ChannelId(3), UserId(2)).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transitions_same_user() {
    let (ledger, store, sink) = memory_ledger(LedgerSettings::new());
    store.set_destination(ChannelId(1)).await.unwrap();
    let ledger = Arc::new(ledger);

    let mut handles = Vec::new();
    for i in 0..20 {
        let ledger = Arc::clone(&ledger);
        handles.push(tokio::spawn(async move {
            ledger
                .on_name_transition(UserId(1), &format!("n{i}"), &format!("n{}", i + 1))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Every old name is appended exactly once, whatever order the updates ran in.
    let record = store.get(UserId(1)).await.unwrap().unwrap();
    let mut past = record.past_names.clone();
    past.sort();
    let mut expected: Vec<String> = (0..20).map(|i| format!("n{i}")).collect();
    expected.sort();
    assert_eq!(past, expected);
    assert!((1..=20).any(|i| record.current_name == format!("n{i}")));
    assert_eq!(sink.create_count(), 1);
    assert_eq!(sink.messages_for(ChannelId(1), UserId(1)).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_transitions_during_sweep_keep_single_message() {
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(RecordingSink::new());
    seed_records(store.as_ref(), 50).await.unwrap();
    let ledger = Arc::new(NameLedger::new(store.clone(), sink.clone()));

    let sweeper = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move { ledger.set_destination(ChannelId(4)).await })
    };
    let renames: Vec<_> = (1..=50u64)
        .map(|id| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move {
                ledger
                    .on_name_transition(UserId(id), &format!("user-{id}"), &format!("renamed-{id}"))
                    .await
            })
        })
        .collect();

    sweeper.await.unwrap().unwrap();
    for rename in renames {
        rename.await.unwrap().unwrap();
    }

    for id in 1..=50u64 {
        let record = store.get(UserId(id)).await.unwrap().unwrap();
        assert_eq!(record.current_name, format!("renamed-{id}"));
        let live = sink.messages_for(ChannelId(4), UserId(id));
        assert_eq!(live, vec![record.artifact_ref.unwrap()]);
        assert_eq!(sink.message(live[0]).unwrap(), render(&record));
    }
}
