//! Core data types for the raffle engine
//!
//! This module provides:
//! - Identifier newtypes for participants and randomness requests
//! - The two-valued lottery phase
//! - Upkeep diagnostics (the four sub-conditions of the close predicate)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// CAPACITY LIMITS
// =============================================================================

/// Default maximum number of entries in a single round.
pub const DEFAULT_MAX_PARTICIPANTS: usize = 10_000;

/// At most one randomness request is outstanding at any time.
pub const MAX_PENDING_REQUESTS: usize = 1;

/// Random words requested per round.
pub const NUM_WORDS: u32 = 1;

/// Consumed request ids remembered to refuse reissued or replayed ids.
pub const CONSUMED_REQUEST_HISTORY: usize = 1_024;

// =============================================================================
// SCALARS
// =============================================================================

/// Amount in the smallest currency unit.
pub type Amount = u64;

/// Seconds since the UNIX epoch.
pub type Timestamp = u64;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Account handle of an entrant. Cloning is cheap; the same participant may
/// appear many times in a round.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(Arc<str>);

impl ParticipantId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

/// Opaque token correlating a randomness request with its fulfillment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// LOTTERY PHASE
// =============================================================================

/// OPEN accepts entries; CALCULATING waits for randomness and accepts none.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotteryState {
    #[default]
    Open,
    Calculating,
}

impl LotteryState {
    /// Numeric encoding (OPEN = 0, CALCULATING = 1).
    pub fn code(self) -> u8 {
        match self {
            LotteryState::Open => 0,
            LotteryState::Calculating => 1,
        }
    }
}

impl fmt::Display for LotteryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LotteryState::Open => f.write_str("OPEN"),
            LotteryState::Calculating => f.write_str("CALCULATING"),
        }
    }
}

// =============================================================================
// UPKEEP
// =============================================================================

/// The four sub-conditions of the round-close predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UpkeepDiagnostics {
    pub time_passed: bool,
    pub is_open: bool,
    pub has_balance: bool,
    pub has_players: bool,
}

impl UpkeepDiagnostics {
    pub fn all(&self) -> bool {
        self.time_passed && self.is_open && self.has_balance && self.has_players
    }
}

impl fmt::Display for UpkeepDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time_passed={} is_open={} has_balance={} has_players={}",
            self.time_passed, self.is_open, self.has_balance, self.has_players
        )
    }
}

/// Result of evaluating the upkeep predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpkeepCheck {
    pub needed: bool,
    pub diagnostics: UpkeepDiagnostics,
}

impl From<UpkeepDiagnostics> for UpkeepCheck {
    fn from(diagnostics: UpkeepDiagnostics) -> Self {
        Self {
            needed: diagnostics.all(),
            diagnostics,
        }
    }
}

// =============================================================================
// PENDING REQUEST
// =============================================================================

/// Outstanding randomness request. Exists iff the lottery is CALCULATING.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub request_id: RequestId,
    pub issued_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upkeep_needed_only_when_all_conditions_hold() {
        let all = UpkeepDiagnostics {
            time_passed: true,
            is_open: true,
            has_balance: true,
            has_players: true,
        };
        assert!(UpkeepCheck::from(all).needed);

        for flip in 0..4 {
            let mut d = all;
            match flip {
                0 => d.time_passed = false,
                1 => d.is_open = false,
                2 => d.has_balance = false,
                _ => d.has_players = false,
            }
            let check = UpkeepCheck::from(d);
            assert!(!check.needed);
            assert_eq!(check.diagnostics, d);
        }
    }

    #[test]
    fn lottery_state_encoding() {
        assert_eq!(LotteryState::default(), LotteryState::Open);
        assert_eq!(LotteryState::Open.code(), 0);
        assert_eq!(LotteryState::Calculating.code(), 1);
        assert_eq!(
            serde_json::to_string(&LotteryState::Calculating).unwrap(),
            "\"CALCULATING\""
        );
    }

    #[test]
    fn participant_ids_compare_by_value() {
        let a = ParticipantId::new("alice");
        let b: ParticipantId = String::from("alice").into();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "alice");
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"alice\"");
    }
}
