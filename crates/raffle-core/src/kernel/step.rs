//! Step function for the raffle kernel.
//! This is the single chokepoint for all state transitions.

use super::{command::Command, invariants::check_invariants, state::State};
use crate::config::RaffleConfig;
use crate::events::RaffleEvent;
use crate::selector::select_winner;
use crate::types::{Amount, LotteryState, ParticipantId};
use crate::upkeep::check_upkeep;
use crate::{RaffleError, Result};

/// Transfer the caller must complete before committing the post-state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub winner: ParticipantId,
    pub winner_index: usize,
    pub amount: Amount,
}

/// Effects produced by a transition (data, not side effects).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Effects {
    pub events: Vec<RaffleEvent>,
    pub payout: Option<Payout>,
}

/// Execute a transition: (state, command) -> Result<(new_state, effects), Error>
///
/// All guards run before the post-state is built, so an `Err` never carries a
/// partial mutation. Invariants are checked pre and post.
pub fn step(state: &State, config: &RaffleConfig, cmd: Command) -> Result<(State, Effects)> {
    check_invariants(state)?;

    let (post, effects) = match cmd {
        Command::Enter {
            participant,
            amount,
        } => {
            if state.phase != LotteryState::Open {
                return Err(RaffleError::LotteryNotOpen);
            }
            if amount < config.entrance_fee {
                return Err(RaffleError::InsufficientEntryFee {
                    required: config.entrance_fee,
                    provided: amount,
                });
            }

            let mut post = state.clone();
            post.registry.admit(participant.clone(), amount)?;

            let effects = Effects {
                events: vec![RaffleEvent::Entered {
                    participant,
                    amount,
                    round: state.round,
                }],
                payout: None,
            };
            (post, effects)
        }
        Command::BeginUpkeep { request_id, now } => {
            let check = check_upkeep(state.phase, &state.registry, config, now);
            if !check.needed {
                return Err(RaffleError::UpkeepNotNeeded(check.diagnostics));
            }

            let mut post = state.clone();
            post.requests.open(request_id, now)?;
            post.phase = LotteryState::Calculating;

            let effects = Effects {
                events: vec![RaffleEvent::UpkeepPerformed {
                    request_id,
                    round: state.round,
                }],
                payout: None,
            };
            (post, effects)
        }
        Command::Fulfill {
            request_id,
            random_value,
            now,
        } => {
            if !state.requests.matches(request_id) {
                return Err(RaffleError::UnknownRequestId(request_id));
            }

            let (winner_index, winner) = select_winner(&state.registry, random_value)?;
            let amount = state.registry.pool_balance();

            let mut post = state.clone();
            post.requests.consume(request_id)?;
            post.registry.reset(now);
            post.last_winner = Some(winner.clone());
            post.phase = LotteryState::Open;
            post.round = state.round.checked_add(1).ok_or(RaffleError::Overflow)?;

            let effects = Effects {
                events: vec![RaffleEvent::WinnerPicked {
                    winner: winner.clone(),
                    amount,
                    round: state.round,
                }],
                payout: Some(Payout {
                    winner,
                    winner_index,
                    amount,
                }),
            };
            (post, effects)
        }
    };

    check_invariants(&post)?;
    Ok((post, effects))
}
