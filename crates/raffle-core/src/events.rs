//! Notifications emitted after successful operations.

use crate::types::{Amount, ParticipantId, RequestId};
use serde::Serialize;
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum RaffleEvent {
    /// A participant entered the current round.
    Entered {
        participant: ParticipantId,
        amount: Amount,
        round: u64,
    },
    /// The round closed and a randomness request was opened.
    UpkeepPerformed { request_id: RequestId, round: u64 },
    /// The round's winner was paid and a new round started.
    WinnerPicked {
        winner: ParticipantId,
        amount: Amount,
        round: u64,
    },
}

impl RaffleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RaffleEvent::Entered { .. } => "Entered",
            RaffleEvent::UpkeepPerformed { .. } => "UpkeepPerformed",
            RaffleEvent::WinnerPicked { .. } => "WinnerPicked",
        }
    }
}

/// Receiver of raffle notifications. Called only after a state change commits.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RaffleEvent);
}

/// Emits every event as a structured log record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &RaffleEvent) {
        match event {
            RaffleEvent::Entered {
                participant,
                amount,
                round,
            } => info!(event = "Entered", %participant, amount, round),
            RaffleEvent::UpkeepPerformed { request_id, round } => {
                info!(event = "UpkeepPerformed", %request_id, round)
            }
            RaffleEvent::WinnerPicked {
                winner,
                amount,
                round,
            } => info!(event = "WinnerPicked", %winner, amount, round),
        }
    }
}

/// Keeps every emitted event in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    log: Mutex<Vec<RaffleEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RaffleEvent> {
        self.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.lock().iter().map(RaffleEvent::name).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RaffleEvent>> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: &RaffleEvent) {
        self.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_preserves_order() {
        let sink = RecordingEventSink::new();
        sink.emit(&RaffleEvent::Entered {
            participant: "a".into(),
            amount: 1,
            round: 0,
        });
        sink.emit(&RaffleEvent::UpkeepPerformed {
            request_id: RequestId(1),
            round: 0,
        });
        assert_eq!(sink.names(), vec!["Entered", "UpkeepPerformed"]);
        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(RaffleEvent::WinnerPicked {
            winner: "w".into(),
            amount: 9,
            round: 2,
        })
        .unwrap();
        assert_eq!(json["event"], "WinnerPicked");
        assert_eq!(json["winner"], "w");
        assert_eq!(json["amount"], 9);
    }
}
