//! Invariant checker for the raffle kernel.

use super::state::State;
use crate::types::{LotteryState, MAX_PENDING_REQUESTS};
use crate::{RaffleError, Result};

/// Check all invariants. Returns Err if any violated.
pub fn check_invariants(state: &State) -> Result<()> {
    if state.registry.participant_count() > state.registry.capacity() {
        return Err(RaffleError::InvariantViolation("ParticipantsWithinCapacity"));
    }

    // AtMostOnePending
    if state.requests.len() > MAX_PENDING_REQUESTS {
        return Err(RaffleError::InvariantViolation("AtMostOnePending"));
    }

    // PendingIffCalculating
    let calculating = state.phase == LotteryState::Calculating;
    if calculating != !state.requests.is_empty() {
        return Err(RaffleError::InvariantViolation("PendingIffCalculating"));
    }

    // PendingNotConsumed
    if let Some(pending) = state.requests.pending() {
        if state.requests.was_consumed(pending.request_id) {
            return Err(RaffleError::InvariantViolation("PendingNotConsumed"));
        }
    }

    // CalculatingHasPlayers
    if calculating && (state.registry.is_empty() || state.registry.pool_balance() == 0) {
        return Err(RaffleError::InvariantViolation("CalculatingHasPlayers"));
    }

    // EmptyRoundHasEmptyPool
    if state.registry.is_empty() && state.registry.pool_balance() != 0 {
        return Err(RaffleError::InvariantViolation("EmptyRoundHasEmptyPool"));
    }

    Ok(())
}
