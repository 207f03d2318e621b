//! Entry registry: the current round's ordered participants and pooled balance.
//!
//! The registry is the round aggregate. It does not know about the lottery phase or
//! the entrance fee; those guards live in the kernel step so that every check runs
//! before any write.

use crate::types::{Amount, ParticipantId, Timestamp};
use crate::{RaffleError, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryRegistry {
    participants: Vec<ParticipantId>,
    pool: Amount,
    started_at: Timestamp,
    #[serde(skip)]
    capacity: usize,
}

impl EntryRegistry {
    pub fn new(started_at: Timestamp, capacity: usize) -> Self {
        Self {
            participants: Vec::new(),
            pool: 0,
            started_at,
            capacity,
        }
    }

    /// Append `participant` and add `amount` to the pool.
    ///
    /// Both capacity and pool overflow are checked before either field is written.
    pub fn admit(&mut self, participant: ParticipantId, amount: Amount) -> Result<()> {
        if self.participants.len() >= self.capacity {
            return Err(RaffleError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let pool = self.pool.checked_add(amount).ok_or(RaffleError::Overflow)?;

        self.participants.push(participant);
        self.pool = pool;
        Ok(())
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn participant_at(&self, index: usize) -> Result<&ParticipantId> {
        self.participants
            .get(index)
            .ok_or(RaffleError::IndexOutOfRange {
                index,
                len: self.participants.len(),
            })
    }

    pub fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }

    pub fn pool_balance(&self) -> Amount {
        self.pool
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Seconds elapsed since the round started; zero if the clock went backwards.
    pub fn elapsed(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.started_at)
    }

    /// Start a new, empty round at `now`.
    pub fn reset(&mut self, now: Timestamp) {
        self.participants.clear();
        self.pool = 0;
        self.started_at = now;
    }
}
