//! Concurrency Tests
//!
//! The engine serializes every mutation behind one write lock. These tests race
//! entries against upkeep and fulfillments against each other.

use raffle_core::{
    InMemoryLedger, LocalVrfProvider, LotteryState, ManualClock, Raffle, RaffleConfig,
    RaffleError, RequestId,
};
use std::sync::{Arc, Barrier};
use std::thread;

const FEE: u64 = 3;

fn engine() -> (Arc<Raffle>, Arc<ManualClock>, Arc<LocalVrfProvider>, Arc<InMemoryLedger>) {
    let clock = Arc::new(ManualClock::new(0));
    let vrf = Arc::new(LocalVrfProvider::new(99));
    let ledger = Arc::new(InMemoryLedger::new());
    let raffle = Raffle::builder(RaffleConfig::new(FEE, 10).unwrap())
        .clock(clock.clone())
        .provider(vrf.clone())
        .payout(ledger.clone())
        .build()
        .unwrap();
    (Arc::new(raffle), clock, vrf, ledger)
}

#[test]
fn entries_racing_upkeep_are_all_or_nothing() {
    let (raffle, clock, _vrf, _ledger) = engine();
    raffle.enter("seed", FEE).unwrap();
    clock.advance(10);

    let barrier = Arc::new(Barrier::new(9));
    let mut entrants = Vec::new();
    for t in 0..8 {
        let raffle = raffle.clone();
        let barrier = barrier.clone();
        entrants.push(thread::spawn(move || {
            barrier.wait();
            let mut accepted = 0u64;
            for i in 0..50 {
                match raffle.enter(format!("t{t}-{i}"), FEE) {
                    Ok(()) => accepted += 1,
                    Err(RaffleError::LotteryNotOpen) => {}
                    Err(other) => panic!("unexpected {other:?}"),
                }
            }
            accepted
        }));
    }

    barrier.wait();
    let rid = raffle.perform_upkeep().unwrap();
    let accepted: u64 = entrants.into_iter().map(|h| h.join().unwrap()).sum();

    // Every accepted entry landed before the round closed; none after.
    assert_eq!(raffle.state(), LotteryState::Calculating);
    assert_eq!(raffle.participant_count() as u64, accepted + 1);
    assert_eq!(raffle.pool_balance(), (accepted + 1) * FEE);
    assert_eq!(raffle.pending_request().map(|p| p.request_id), Some(rid));
}

#[test]
fn concurrent_upkeeps_open_exactly_one_request() {
    let (raffle, clock, vrf, _ledger) = engine();
    raffle.enter("a", FEE).unwrap();
    clock.advance(10);

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let raffle = raffle.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                raffle.perform_upkeep()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let ok: Vec<RequestId> = results.iter().filter_map(|r| r.as_ref().ok().copied()).collect();
    assert_eq!(ok.len(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(err, RaffleError::UpkeepNotNeeded(d) if !d.is_open));
    }
    assert_eq!(vrf.outstanding(), ok);
}

#[test]
fn duplicate_deliveries_pay_once() {
    let (raffle, clock, _vrf, ledger) = engine();
    for p in ["a", "b", "c"] {
        raffle.enter(p, FEE).unwrap();
    }
    clock.advance(10);
    let rid = raffle.perform_upkeep().unwrap();

    let barrier = Arc::new(Barrier::new(6));
    let handles: Vec<_> = (0..6u64)
        .map(|i| {
            let raffle = raffle.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                raffle.fulfill_randomness(rid, i)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == RaffleError::UnknownRequestId(rid)));
    assert_eq!(ledger.transfer_count(), 1);
    assert_eq!(ledger.total_paid(), 3 * FEE);
    assert_eq!(raffle.state(), LotteryState::Open);
}
