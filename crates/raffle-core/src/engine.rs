//! Raffle engine: serialized access to the kernel and its collaborators.
//!
//! All mutating operations take the single write lock for their whole duration, so
//! `enter`, `perform_upkeep` and `fulfill_randomness` never observe-then-mutate
//! concurrently. Readers share the read lock and always see one committed state.
//!
//! Each mutation runs the kernel [`step`] against the current state to obtain a
//! staged post-state. The staged state replaces the current one only after every
//! external effect of the transition (provider request, payout transfer) has
//! succeeded. On failure the staged state is dropped and nothing changes.

use crate::clock::{Clock, SystemClock};
use crate::config::{EngineConfig, RaffleConfig};
use crate::events::{EventSink, TracingEventSink};
use crate::kernel::{step, Command, Effects, State};
use crate::metrics::RaffleMetrics;
use crate::payout::PayoutSink;
use crate::randomness::RandomnessProvider;
use crate::types::{
    Amount, LotteryState, ParticipantId, PendingRequest, RequestId, Timestamp, UpkeepCheck,
    DEFAULT_MAX_PARTICIPANTS, NUM_WORDS,
};
use crate::upkeep::check_upkeep;
use crate::{RaffleError, Result};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Consistent read-only view of the engine, taken under one lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaffleSnapshot {
    pub state: LotteryState,
    pub participants: Vec<ParticipantId>,
    pub pool_balance: Amount,
    pub started_at: Timestamp,
    pub pending_request: Option<PendingRequest>,
    pub last_winner: Option<ParticipantId>,
    pub round: u64,
    pub entrance_fee: Amount,
    pub interval_secs: u64,
}

pub struct Raffle {
    config: RaffleConfig,
    state: RwLock<State>,
    clock: Arc<dyn Clock>,
    provider: Arc<dyn RandomnessProvider>,
    payout: Arc<dyn PayoutSink>,
    events: Arc<dyn EventSink>,
    metrics: RaffleMetrics,
}

impl Raffle {
    pub fn builder(config: RaffleConfig) -> RaffleBuilder {
        RaffleBuilder::new(config)
    }

    // -------------------------------------------------------------------------
    // Mutating operations
    // -------------------------------------------------------------------------

    /// Enter `participant` into the open round, paying `amount`.
    ///
    /// Any amount above the entrance fee stays in the pool; no change is returned.
    #[instrument(level = "debug", skip(self, participant))]
    pub fn enter(&self, participant: impl Into<ParticipantId>, amount: Amount) -> Result<()> {
        let participant = participant.into();
        let mut state = self.write();

        let cmd = Command::Enter {
            participant: participant.clone(),
            amount,
        };
        let (post, effects) = match step(&state, &self.config, cmd) {
            Ok(transition) => transition,
            Err(e) => {
                self.metrics.entries_rejected.inc();
                debug!(%participant, amount, code = e.code(), error = %e, "entry rejected");
                return Err(e);
            }
        };

        self.commit(&mut state, post, &effects);
        self.metrics.entries_accepted.inc();
        debug!(
            %participant,
            amount,
            participants = state.registry.participant_count(),
            pool = state.registry.pool_balance(),
            "entry accepted"
        );
        Ok(())
    }

    /// Close the round and open a randomness request for it.
    ///
    /// Re-evaluates the upkeep predicate under the write lock; a concurrent second
    /// call sees CALCULATING and fails with `UpkeepNotNeeded`.
    #[instrument(level = "debug", skip(self))]
    pub fn perform_upkeep(&self) -> Result<RequestId> {
        let mut state = self.write();
        let now = self.clock.now();

        let check = check_upkeep(state.phase, &state.registry, &self.config, now);
        if !check.needed {
            self.metrics.upkeeps_rejected.inc();
            debug!(diagnostics = %check.diagnostics, "upkeep not needed");
            return Err(RaffleError::UpkeepNotNeeded(check.diagnostics));
        }

        let request_id = match self.provider.request_randomness(NUM_WORDS) {
            Ok(id) => id,
            Err(e) => {
                self.metrics.upkeeps_rejected.inc();
                warn!(code = e.code(), error = %e, "randomness request failed");
                return Err(e);
            }
        };

        let cmd = Command::BeginUpkeep { request_id, now };
        let (post, effects) = match step(&state, &self.config, cmd) {
            Ok(transition) => transition,
            Err(e) => {
                self.provider.cancel_request(request_id);
                self.metrics.upkeeps_rejected.inc();
                warn!(%request_id, code = e.code(), error = %e, "upkeep transition refused");
                return Err(e);
            }
        };

        self.commit(&mut state, post, &effects);
        self.metrics.upkeeps_performed.inc();
        info!(
            %request_id,
            round = state.round,
            participants = state.registry.participant_count(),
            pool = state.registry.pool_balance(),
            "round closed; randomness requested"
        );
        Ok(request_id)
    }

    /// Deliver the random value for `request_id`: select the winner, pay the pool
    /// and start a new round, all or nothing.
    ///
    /// If the transfer fails the engine stays CALCULATING with the request still
    /// pending, so a later delivery for the same id can retry the payout.
    #[instrument(level = "debug", skip(self))]
    pub fn fulfill_randomness(
        &self,
        request_id: RequestId,
        random_value: u64,
    ) -> Result<ParticipantId> {
        let mut state = self.write();
        let now = self.clock.now();

        let cmd = Command::Fulfill {
            request_id,
            random_value,
            now,
        };
        let (post, effects) = match step(&state, &self.config, cmd) {
            Ok(transition) => transition,
            Err(e) => {
                self.metrics.fulfillments_rejected.inc();
                warn!(%request_id, code = e.code(), error = %e, "fulfillment rejected");
                return Err(e);
            }
        };

        let payout = effects
            .payout
            .clone()
            .ok_or(RaffleError::InvariantViolation("FulfillStagesPayout"))?;

        if let Err(e) = self.payout.transfer(&payout.winner, payout.amount) {
            self.metrics.payout_failures.inc();
            warn!(
                %request_id,
                winner = %payout.winner,
                amount = payout.amount,
                error = %e,
                "payout failed; round stays CALCULATING"
            );
            return Err(RaffleError::PayoutFailed {
                winner: payout.winner,
                amount: payout.amount,
                reason: e.to_string(),
            });
        }

        let round = state.round;
        self.commit(&mut state, post, &effects);
        self.metrics.fulfillments_accepted.inc();
        info!(
            %request_id,
            round,
            winner = %payout.winner,
            winner_index = payout.winner_index,
            amount = payout.amount,
            "winner picked"
        );
        Ok(payout.winner)
    }

    // -------------------------------------------------------------------------
    // Read-only operations
    // -------------------------------------------------------------------------

    /// Evaluate the upkeep predicate against the current state and clock.
    pub fn check_upkeep(&self) -> UpkeepCheck {
        let state = self.read();
        check_upkeep(state.phase, &state.registry, &self.config, self.clock.now())
    }

    pub fn state(&self) -> LotteryState {
        self.read().phase
    }

    pub fn entrance_fee(&self) -> Amount {
        self.config.entrance_fee
    }

    pub fn interval(&self) -> Duration {
        self.config.interval()
    }

    pub fn interval_secs(&self) -> u64 {
        self.config.interval_secs
    }

    pub fn participant_count(&self) -> usize {
        self.read().registry.participant_count()
    }

    pub fn participant_at(&self, index: usize) -> Result<ParticipantId> {
        self.read().registry.participant_at(index).cloned()
    }

    pub fn pool_balance(&self) -> Amount {
        self.read().registry.pool_balance()
    }

    pub fn last_winner(&self) -> Option<ParticipantId> {
        self.read().last_winner.clone()
    }

    /// Start time of the current round.
    pub fn last_timestamp(&self) -> Timestamp {
        self.read().registry.started_at()
    }

    pub fn pending_request(&self) -> Option<PendingRequest> {
        self.read().requests.pending().copied()
    }

    /// Number of completed rounds.
    pub fn round(&self) -> u64 {
        self.read().round
    }

    pub fn num_words(&self) -> u32 {
        NUM_WORDS
    }

    pub fn request_confirmations(&self) -> u16 {
        self.provider.request_confirmations()
    }

    pub fn config(&self) -> &RaffleConfig {
        &self.config
    }

    pub fn metrics(&self) -> &RaffleMetrics {
        &self.metrics
    }

    pub fn snapshot(&self) -> RaffleSnapshot {
        let state = self.read();
        RaffleSnapshot {
            state: state.phase,
            participants: state.registry.participants().to_vec(),
            pool_balance: state.registry.pool_balance(),
            started_at: state.registry.started_at(),
            pending_request: state.requests.pending().copied(),
            last_winner: state.last_winner.clone(),
            round: state.round,
            entrance_fee: self.config.entrance_fee,
            interval_secs: self.config.interval_secs,
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Replace the state with `post` and publish the transition's events.
    ///
    /// Events are emitted under the write lock so their order matches commit order.
    fn commit(&self, state: &mut RwLockWriteGuard<'_, State>, post: State, effects: &Effects) {
        **state = post;
        self.metrics
            .participants
            .set(state.registry.participant_count() as u64);
        self.metrics.pool_balance.set(state.registry.pool_balance());
        for event in &effects.events {
            self.events.emit(event);
        }
    }

    // The state is only ever replaced wholesale after a successful step, so a
    // poisoned lock still guards a consistent state.
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for Raffle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raffle")
            .field("config", &self.config)
            .field("state", &*self.read())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`Raffle`]. A randomness provider and a payout sink are required.
pub struct RaffleBuilder {
    config: RaffleConfig,
    max_participants: usize,
    clock: Option<Arc<dyn Clock>>,
    provider: Option<Arc<dyn RandomnessProvider>>,
    payout: Option<Arc<dyn PayoutSink>>,
    events: Option<Arc<dyn EventSink>>,
}

impl RaffleBuilder {
    pub fn new(config: RaffleConfig) -> Self {
        Self {
            config,
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            clock: None,
            provider: None,
            payout: None,
            events: None,
        }
    }

    pub fn from_engine_config(config: &EngineConfig) -> Self {
        Self::new(config.raffle).max_participants(config.max_participants)
    }

    pub fn max_participants(mut self, max: usize) -> Self {
        self.max_participants = max;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn RandomnessProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn payout(mut self, payout: Arc<dyn PayoutSink>) -> Self {
        self.payout = Some(payout);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Validate and construct. The first round starts at the clock's current time.
    pub fn build(self) -> Result<Raffle> {
        self.config.validate()?;
        if self.max_participants == 0 {
            return Err(RaffleError::InvalidConfig(
                "max_participants must be greater than 0".into(),
            ));
        }
        let provider = self.provider.ok_or_else(|| {
            RaffleError::InvalidConfig("a randomness provider is required".into())
        })?;
        let payout = self
            .payout
            .ok_or_else(|| RaffleError::InvalidConfig("a payout sink is required".into()))?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let events = self.events.unwrap_or_else(|| Arc::new(TracingEventSink));

        let state = State::init(clock.now(), self.max_participants);
        info!(
            entrance_fee = self.config.entrance_fee,
            interval_secs = self.config.interval_secs,
            max_participants = self.max_participants,
            started_at = state.registry.started_at(),
            "raffle initialized"
        );

        Ok(Raffle {
            config: self.config,
            state: RwLock::new(state),
            clock,
            provider,
            payout,
            events,
            metrics: RaffleMetrics::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::RecordingEventSink;
    use crate::payout::InMemoryLedger;
    use crate::randomness::LocalVrfProvider;

    struct Harness {
        raffle: Raffle,
        clock: Arc<ManualClock>,
        vrf: Arc<LocalVrfProvider>,
        ledger: Arc<InMemoryLedger>,
        events: Arc<RecordingEventSink>,
    }

    fn harness(fee: Amount, interval: u64) -> Harness {
        let clock = Arc::new(ManualClock::new(1_000));
        let vrf = Arc::new(LocalVrfProvider::new(42));
        let ledger = Arc::new(InMemoryLedger::new());
        let events = Arc::new(RecordingEventSink::new());
        let raffle = Raffle::builder(RaffleConfig::new(fee, interval).unwrap())
            .clock(clock.clone())
            .provider(vrf.clone())
            .payout(ledger.clone())
            .events(events.clone())
            .build()
            .expect("raffle builds");
        Harness {
            raffle,
            clock,
            vrf,
            ledger,
            events,
        }
    }

    #[test]
    fn builder_requires_collaborators() {
        let cfg = RaffleConfig::new(1, 1).unwrap();
        assert!(matches!(
            Raffle::builder(cfg).build(),
            Err(RaffleError::InvalidConfig(_))
        ));
        assert!(matches!(
            Raffle::builder(cfg)
                .provider(Arc::new(LocalVrfProvider::new(0)))
                .build(),
            Err(RaffleError::InvalidConfig(_))
        ));
        assert!(matches!(
            Raffle::builder(cfg)
                .provider(Arc::new(LocalVrfProvider::new(0)))
                .payout(Arc::new(InMemoryLedger::new()))
                .max_participants(0)
                .build(),
            Err(RaffleError::InvalidConfig(_))
        ));
    }

    #[test]
    fn constructed_open_with_parameters() {
        let h = harness(1, 30);
        assert_eq!(h.raffle.state(), LotteryState::Open);
        assert_eq!(h.raffle.entrance_fee(), 1);
        assert_eq!(h.raffle.interval(), Duration::from_secs(30));
        assert_eq!(h.raffle.last_timestamp(), 1_000);
        assert_eq!(h.raffle.last_winner(), None);
        assert_eq!(h.raffle.num_words(), 1);
        assert_eq!(h.raffle.request_confirmations(), 3);
    }

    #[test]
    fn sole_participant_wins_whole_pool() {
        let h = harness(1, 30);
        h.raffle.enter("alice", 1).unwrap();
        h.clock.advance(30);

        let rid = h.raffle.perform_upkeep().unwrap();
        assert!(rid.0 > 0);
        let winner = h.raffle.fulfill_randomness(rid, 7).unwrap();

        assert_eq!(winner.as_str(), "alice");
        assert_eq!(h.ledger.balance_of(&winner), 1);
        assert_eq!(h.raffle.pool_balance(), 0);
        assert_eq!(h.raffle.state(), LotteryState::Open);
        assert_eq!(h.raffle.last_winner(), Some(winner));
        assert_eq!(h.raffle.last_timestamp(), 1_030);
        assert_eq!(
            h.events.names(),
            vec!["Entered", "UpkeepPerformed", "WinnerPicked"]
        );
    }

    #[test]
    fn payout_failure_rolls_back_everything() {
        let h = harness(5, 10);
        h.raffle.enter("a", 5).unwrap();
        h.raffle.enter("b", 6).unwrap();
        h.clock.advance(10);
        let rid = h.raffle.perform_upkeep().unwrap();
        let before = h.raffle.snapshot();
        h.events.clear();

        let b = ParticipantId::new("b");
        h.ledger.refuse(&b);
        let err = h.raffle.fulfill_randomness(rid, 1).unwrap_err();
        assert_eq!(
            err,
            RaffleError::PayoutFailed {
                winner: b.clone(),
                amount: 11,
                reason: format!("recipient {b} rejected funds"),
            }
        );
        assert_eq!(h.raffle.snapshot(), before);
        assert!(h.events.events().is_empty());
        assert_eq!(h.raffle.metrics().snapshot().payout_failures, 1);

        // Retry with the same id once the recipient accepts.
        h.ledger.accept(&b);
        assert_eq!(h.raffle.fulfill_randomness(rid, 1).unwrap(), b);
        assert_eq!(h.ledger.balance_of(&b), 11);
        assert_eq!(h.raffle.state(), LotteryState::Open);
    }

    #[test]
    fn local_provider_round_trip() {
        let h = harness(2, 5);
        for p in ["a", "b", "c"] {
            h.raffle.enter(p, 2).unwrap();
        }
        h.clock.advance(5);
        let rid = h.raffle.perform_upkeep().unwrap();
        let expected_index = (h.vrf.random_value_for(rid) % 3) as usize;
        let expected = h.raffle.participant_at(expected_index).unwrap();

        let winner = h.vrf.deliver(&h.raffle, rid).unwrap();
        assert_eq!(winner, expected);
        assert!(h.vrf.outstanding().is_empty());
        assert!(matches!(
            h.vrf.deliver(&h.raffle, rid),
            Err(RaffleError::ProviderError(_))
        ));
    }

    #[test]
    fn upkeep_rejection_reports_diagnostics_and_changes_nothing() {
        let h = harness(1, 30);
        let before = h.raffle.snapshot();
        let err = h.raffle.perform_upkeep().unwrap_err();
        match err {
            RaffleError::UpkeepNotNeeded(d) => {
                assert!(d.is_open);
                assert!(!d.time_passed && !d.has_balance && !d.has_players);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(h.raffle.snapshot(), before);
        assert!(h.vrf.outstanding().is_empty());
    }
}
