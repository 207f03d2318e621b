//! Winner selection: maps a delivered random value to a participant.

use crate::registry::EntryRegistry;
use crate::types::ParticipantId;
use crate::{RaffleError, Result};

/// `random_value mod participant_count`.
///
/// A zero count can only be reached if the phase/registry invariant is broken,
/// so it is reported as an invariant violation rather than a caller error.
pub fn winner_index(random_value: u64, participant_count: usize) -> Result<usize> {
    if participant_count == 0 {
        return Err(RaffleError::InvariantViolation("CalculatingHasPlayers"));
    }
    let count = u64::try_from(participant_count).map_err(|_| RaffleError::Overflow)?;
    usize::try_from(random_value % count).map_err(|_| RaffleError::Overflow)
}

/// Select the winner of the round held by `registry`.
pub fn select_winner(
    registry: &EntryRegistry,
    random_value: u64,
) -> Result<(usize, ParticipantId)> {
    let index = winner_index(random_value, registry.participant_count())?;
    let winner = registry.participant_at(index)?.clone();
    Ok((index, winner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_participant_always_wins() {
        let mut reg = EntryRegistry::new(0, 4);
        reg.admit("solo".into(), 1).unwrap();
        assert_eq!(select_winner(&reg, 7).unwrap(), (0, ParticipantId::new("solo")));
    }

    #[test]
    fn index_mapping_preserves_entry_order() {
        let mut reg = EntryRegistry::new(0, 4);
        reg.admit("A".into(), 1).unwrap();
        reg.admit("B".into(), 1).unwrap();
        assert_eq!(select_winner(&reg, 0).unwrap().1.as_str(), "A");
        assert_eq!(select_winner(&reg, 1).unwrap().1.as_str(), "B");
        assert_eq!(select_winner(&reg, 2).unwrap().1.as_str(), "A");
    }

    #[test]
    fn empty_round_is_an_invariant_violation() {
        let reg = EntryRegistry::new(0, 4);
        assert!(matches!(
            select_winner(&reg, 5),
            Err(RaffleError::InvariantViolation(_))
        ));
    }

    proptest! {
        #[test]
        fn index_is_value_mod_count(r in any::<u64>(), n in 1usize..10_000) {
            let idx = winner_index(r, n).unwrap();
            prop_assert!(idx < n);
            prop_assert_eq!(idx as u64, r % n as u64);
        }
    }
}
