//! State struct for the raffle kernel.

use crate::randomness::RequestTracker;
use crate::registry::EntryRegistry;
use crate::types::{LotteryState, ParticipantId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub phase: LotteryState,
    pub registry: EntryRegistry,
    pub requests: RequestTracker,
    pub last_winner: Option<ParticipantId>,
    /// Completed rounds; also the zero-based index of the current round.
    pub round: u64,
}

impl State {
    /// Initial state: OPEN, empty round started at `started_at`.
    pub fn init(started_at: Timestamp, max_participants: usize) -> Self {
        Self {
            phase: LotteryState::Open,
            registry: EntryRegistry::new(started_at, max_participants),
            requests: RequestTracker::new(),
            last_winner: None,
            round: 0,
        }
    }
}
