//! Commands for the raffle kernel.

use crate::types::{Amount, ParticipantId, RequestId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append a participant to the open round.
    Enter {
        participant: ParticipantId,
        amount: Amount,
    },
    /// Close the round and record the randomness request issued for it.
    BeginUpkeep {
        request_id: RequestId,
        now: Timestamp,
    },
    /// Consume the pending request, select the winner and reset the round.
    Fulfill {
        request_id: RequestId,
        random_value: u64,
        now: Timestamp,
    },
}
