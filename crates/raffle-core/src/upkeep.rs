//! Upkeep predicate: decides whether the current round should close.

use crate::config::RaffleConfig;
use crate::registry::EntryRegistry;
use crate::types::{LotteryState, Timestamp, UpkeepCheck, UpkeepDiagnostics};

/// Evaluate the round-close predicate.
///
/// `needed = is_open && time_passed && has_balance && has_players`. Pure; never
/// mutates anything and is safe to call in any phase (always false while
/// CALCULATING).
pub fn check_upkeep(
    phase: LotteryState,
    registry: &EntryRegistry,
    config: &RaffleConfig,
    now: Timestamp,
) -> UpkeepCheck {
    UpkeepCheck::from(UpkeepDiagnostics {
        time_passed: registry.elapsed(now) >= config.interval_secs,
        is_open: phase == LotteryState::Open,
        has_balance: registry.pool_balance() > 0,
        has_players: registry.participant_count() > 0,
    })
}
