//! Raffle kernel: the lottery state machine as a pure transition function.
//!
//! - Every transition goes through [`step::step`]
//! - Invariants are checked pre and post
//! - A transition returns a staged post-state; nothing is written until the caller
//!   commits it, so a failed transition leaves the prior state intact

pub mod command;
pub mod invariants;
pub mod state;
pub mod step;


pub use command::Command;
pub use invariants::check_invariants;
pub use state::State;
pub use step::{step, Effects, Payout};
