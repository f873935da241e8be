//! Concurrency tests for the transfer engine
//!
//! Many threads drive transfers through clones of one engine. The tests check
//! the properties that must survive any interleaving: money is conserved, no
//! balance goes negative, entries match balances, and opposite-direction
//! transfers between the same accounts never deadlock. Readers running
//! alongside the writers must never observe half of a transfer.

use ledger_engine::{
    AccountId, AccountStore, EntryStore, ErrorKind, Ledger, LedgerConfig, NewAccount,
    TransferEngine, TransferFilter, TransferStore,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

fn open_accounts(config: LedgerConfig, balances: &[i64]) -> (TransferEngine, Vec<AccountId>) {
    let mut ledger = Ledger::new(config);
    let ids = balances
        .iter()
        .enumerate()
        .map(|(i, balance)| {
            ledger
                .create_account(NewAccount::new(format!("owner-{}", i), *balance, "USD"))
                .unwrap()
                .id
        })
        .collect();
    (TransferEngine::new(ledger), ids)
}

/// Run `per_thread` transfers on each of `threads` threads, all released at once
fn run_threads<F>(engine: &TransferEngine, threads: usize, per_thread: usize, work: F) -> Vec<bool>
where
    F: Fn(&TransferEngine, usize, usize) -> bool + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let engine = engine.clone();
            let work = Arc::clone(&work);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..per_thread)
                    .map(|i| work(&engine, t, i))
                    .collect::<Vec<bool>>()
            })
        })
        .collect();

    handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect()
}

#[test]
fn test_alternating_transfers_do_not_deadlock() {
    let (engine, ids) = open_accounts(LedgerConfig::default(), &[10_000, 10_000]);
    let (a, b) = (ids[0], ids[1]);
    let started = Instant::now();

    // 16 threads x 20 transfers; even threads send A->B, odd threads B->A.
    let outcomes = run_threads(&engine, 16, 20, move |engine, t, _| {
        let (from, to) = if t % 2 == 0 { (a, b) } else { (b, a) };
        engine.transfer(from, to, 10).is_ok()
    });

    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(outcomes.len(), 320);
    assert!(outcomes.iter().all(|ok| *ok));

    let ledger = engine.ledger();
    assert_eq!(ledger.get_account(a).unwrap().balance, 10_000);
    assert_eq!(ledger.get_account(b).unwrap().balance, 10_000);
    assert_eq!(ledger.transfer_count(), 320);
    assert_eq!(ledger.entry_count(), 640);
}

#[test]
fn test_concurrent_debits_never_overdraw() {
    let (engine, ids) = open_accounts(LedgerConfig::default(), &[100, 0]);
    let (a, b) = (ids[0], ids[1]);
    let insufficient = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&insufficient);
    let outcomes = run_threads(&engine, 20, 3, move |engine, _, _| {
        match engine.transfer(a, b, 10) {
            Ok(_) => true,
            Err(error) => {
                assert_eq!(error.kind(), ErrorKind::InsufficientFunds);
                counter.fetch_add(1, Ordering::SeqCst);
                false
            }
        }
    });

    let committed = outcomes.iter().filter(|ok| **ok).count();
    assert_eq!(committed, 10);
    assert_eq!(insufficient.load(Ordering::SeqCst), 50);

    let ledger = engine.ledger();
    assert_eq!(ledger.get_account(a).unwrap().balance, 0);
    assert_eq!(ledger.get_account(b).unwrap().balance, 100);
    assert_eq!(ledger.transfer_count(), 10);
    assert_eq!(ledger.entry_count(), 20);
}

#[test]
fn test_money_is_conserved_across_many_accounts() {
    let balances = [500; 8];
    let (engine, ids) = open_accounts(LedgerConfig::default(), &balances);
    let ids = Arc::new(ids);

    let pair_ids = Arc::clone(&ids);
    let outcomes = run_threads(&engine, 12, 40, move |engine, t, i| {
        // Deterministic pseudo-random pair per (thread, iteration).
        let n = pair_ids.len();
        let from = pair_ids[(t * 7 + i * 3) % n];
        let to = pair_ids[(t * 5 + i * 11 + 1) % n];
        let amount = ((t + i) % 50 + 1) as i64;
        match engine.transfer(from, to, amount) {
            Ok(_) => true,
            Err(error) => {
                assert!(matches!(
                    error.kind(),
                    ErrorKind::InsufficientFunds | ErrorKind::InvalidArgument
                ));
                false
            }
        }
    });

    let ledger = engine.ledger();
    let committed = outcomes.iter().filter(|ok| **ok).count();
    assert_eq!(ledger.total_balance(), 4000);
    assert_eq!(ledger.transfer_count(), committed);
    assert_eq!(ledger.entry_count(), committed * 2);

    // Each balance equals its opening balance plus the sum of its entries.
    for id in ids.iter() {
        let account = ledger.get_account(*id).unwrap();
        assert!(account.balance >= 0);
        let movement: i64 = ledger
            .list_entries(*id, usize::MAX, 0)
            .unwrap()
            .iter()
            .map(|entry| entry.amount)
            .sum();
        assert_eq!(account.balance, 500 + movement);
    }

    // Every transfer touching an account shows up in its listing.
    let touching: usize = ids
        .iter()
        .map(|id| {
            ledger
                .list_transfers(TransferFilter::touching(*id), usize::MAX, 0)
                .unwrap()
                .len()
        })
        .sum();
    assert_eq!(touching, committed * 2);
}

#[test]
fn test_concurrent_readers_see_whole_transfers() {
    let (engine, ids) = open_accounts(LedgerConfig::default(), &[1_000_000, 1_000_000]);
    let (a, b) = (ids[0], ids[1]);
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let ledger = engine.ledger().clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut reads = 0u64;
            loop {
                let totals = ledger.totals();
                assert_eq!(totals.total_balance, 2_000_000);
                assert_eq!(totals.entries, 2 * totals.transfers);

                let listed: i128 = ledger
                    .accounts()
                    .iter()
                    .map(|account| i128::from(account.balance))
                    .sum();
                assert_eq!(listed, 2_000_000);

                reads += 1;
                if done.load(Ordering::SeqCst) {
                    return reads;
                }
            }
        })
    };

    let outcomes = run_threads(&engine, 4, 2_000, move |engine, t, _| {
        let (from, to) = if t % 2 == 0 { (a, b) } else { (b, a) };
        engine.transfer(from, to, 1).is_ok()
    });
    done.store(true, Ordering::SeqCst);

    let reads = reader.join().unwrap();
    assert!(reads > 0);
    assert!(outcomes.iter().all(|ok| *ok));
    assert_eq!(engine.ledger().transfer_count(), 8_000);
    assert_eq!(engine.ledger().total_balance(), 2_000_000);
}

#[test]
fn test_reads_are_idempotent_between_writes() {
    let (engine, ids) = open_accounts(LedgerConfig::default(), &[100, 100]);
    let result = engine.transfer(ids[0], ids[1], 25).unwrap();
    let ledger = engine.ledger();

    let first = ledger.get_account(ids[0]).unwrap();
    let second = ledger.get_account(ids[0]).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, result.from_account);
    assert_eq!(
        ledger.get_transfer(result.transfer.id).unwrap(),
        ledger.get_transfer(result.transfer.id).unwrap()
    );
}
