//! Time-interval raffle engine.
//!
//! Participants enter an OPEN round by paying at least the entrance fee. Once the
//! interval has elapsed and the round holds players and funds, upkeep closes the
//! round and requests one random word. Delivering that word selects
//! `participants[r % n]`, pays the whole pool to the winner and starts a new round.
//!
//! ```rust,ignore
//! let vrf = Arc::new(LocalVrfProvider::new(7));
//! let raffle = Raffle::builder(RaffleConfig::new(10, 30)?)
//!     .provider(vrf.clone())
//!     .payout(Arc::new(InMemoryLedger::new()))
//!     .build()?;
//! raffle.enter("alice", 10)?;
//! // ... after the interval
//! let request_id = raffle.perform_upkeep()?;
//! let winner = vrf.deliver(&raffle, request_id)?;
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod kernel;
pub mod metrics;
pub mod payout;
pub mod randomness;
pub mod registry;
pub mod selector;
pub mod types;
pub mod upkeep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, LoggingConfig, RaffleConfig};
pub use engine::{Raffle, RaffleBuilder, RaffleSnapshot};
pub use error::{RaffleError, Result};
pub use events::{EventSink, RaffleEvent, RecordingEventSink, TracingEventSink};
pub use metrics::{MetricsSnapshot, RaffleMetrics};
pub use payout::{InMemoryLedger, PayoutSink, TransferError};
pub use randomness::{LocalVrfProvider, RandomnessProvider};
pub use types::{
    Amount, LotteryState, ParticipantId, PendingRequest, RequestId, Timestamp, UpkeepCheck,
    UpkeepDiagnostics,
};
