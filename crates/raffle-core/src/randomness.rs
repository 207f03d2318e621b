//! Randomness requests: the provider boundary and the request correlation table.
//!
//! A provider opens a request and later delivers exactly one value for it, out of
//! band, through [`Raffle::fulfill_randomness`](crate::engine::Raffle::fulfill_randomness).
//! The engine never blocks waiting for the value; it only records the outstanding
//! request in a [`RequestTracker`] so the callback can be correlated.

use crate::engine::Raffle;
use crate::types::{
    ParticipantId, PendingRequest, RequestId, Timestamp, CONSUMED_REQUEST_HISTORY,
    MAX_PENDING_REQUESTS,
};
use crate::{RaffleError, Result};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use tracing::debug;

/// Domain separation tag for locally derived random words.
pub const LOCAL_VRF_DOMAIN_V1: &[u8] = b"RAFFLE_LOCAL_VRF_V1";

/// External randomness service (oracle / VRF coordinator).
///
/// Contract: every id returned by `request_randomness` is unique and non-zero, and
/// the provider eventually delivers one value for it through the engine's
/// fulfillment entry point.
pub trait RandomnessProvider: Send + Sync {
    /// Open a new request for `num_words` random values.
    fn request_randomness(&self, num_words: u32) -> Result<RequestId>;

    /// Block confirmations the provider waits before answering.
    fn request_confirmations(&self) -> u16 {
        3
    }

    /// Withdraw a request the consumer refused to record. No value will be
    /// accepted for it.
    fn cancel_request(&self, _request_id: RequestId) {}
}

// =============================================================================
// REQUEST CORRELATION
// =============================================================================

/// Correlation table from request id to the round context awaiting it.
///
/// Holds at most [`MAX_PENDING_REQUESTS`] entries. A request is consumed exactly
/// once; any later delivery for the same id is unknown. The last
/// [`CONSUMED_REQUEST_HISTORY`] consumed ids are remembered so a provider that
/// reissues one cannot reopen it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTracker {
    pending: Option<PendingRequest>,
    consumed: VecDeque<RequestId>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            pending: None,
            consumed: VecDeque::new(),
        }
    }

    /// Record a newly issued request.
    pub fn open(&mut self, request_id: RequestId, issued_at: Timestamp) -> Result<()> {
        if self.matches(request_id) || self.was_consumed(request_id) {
            return Err(RaffleError::ProviderError(format!(
                "provider reissued request id {request_id}"
            )));
        }
        if self.pending.is_some() {
            return Err(RaffleError::CapacityExceeded {
                capacity: MAX_PENDING_REQUESTS,
            });
        }
        self.pending = Some(PendingRequest {
            request_id,
            issued_at,
        });
        Ok(())
    }

    pub fn matches(&self, request_id: RequestId) -> bool {
        self.pending.is_some_and(|p| p.request_id == request_id)
    }

    pub fn was_consumed(&self, request_id: RequestId) -> bool {
        self.consumed.contains(&request_id)
    }

    /// Remove and return the pending request for `request_id`.
    pub fn consume(&mut self, request_id: RequestId) -> Result<PendingRequest> {
        if !self.matches(request_id) {
            return Err(RaffleError::UnknownRequestId(request_id));
        }
        let pending = self
            .pending
            .take()
            .ok_or(RaffleError::UnknownRequestId(request_id))?;

        if self.consumed.len() >= CONSUMED_REQUEST_HISTORY {
            self.consumed.pop_front();
        }
        self.consumed.push_back(request_id);
        Ok(pending)
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn len(&self) -> usize {
        usize::from(self.pending.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// LOCAL PROVIDER
// =============================================================================

#[derive(Debug, Default)]
struct LocalVrfState {
    next_id: u64,
    outstanding: BTreeMap<RequestId, u32>,
}

/// In-process VRF coordinator for local networks, tests and simulations.
///
/// Issues ids 1, 2, 3, ... and derives each value deterministically from
/// `SHA-256(domain || seed || request_id)`. Delivery is explicit via
/// [`LocalVrfProvider::deliver`], which plays the coordinator calling back into
/// the consumer.
#[derive(Debug)]
pub struct LocalVrfProvider {
    seed: u64,
    confirmations: u16,
    state: Mutex<LocalVrfState>,
}

impl LocalVrfProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            confirmations: 3,
            state: Mutex::new(LocalVrfState::default()),
        }
    }

    pub fn with_confirmations(mut self, confirmations: u16) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// Random word the provider will deliver for `request_id`.
    pub fn random_value_for(&self, request_id: RequestId) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(LOCAL_VRF_DOMAIN_V1);
        hasher.update(self.seed.to_le_bytes());
        hasher.update(request_id.0.to_le_bytes());
        let digest = hasher.finalize();
        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(word)
    }

    /// Ids issued and not yet accepted by a consumer.
    pub fn outstanding(&self) -> Vec<RequestId> {
        self.lock().outstanding.keys().copied().collect()
    }

    /// Deliver the value for `request_id` to `raffle`.
    ///
    /// Fails with `ProviderError("nonexistent request")` for ids this provider never
    /// issued or already delivered. An id the consumer answers with
    /// `UnknownRequestId` is dropped; on any other rejection (such as a failed
    /// payout) the request stays outstanding so delivery can be retried.
    pub fn deliver(&self, raffle: &Raffle, request_id: RequestId) -> Result<ParticipantId> {
        self.deliver_value(raffle, request_id, self.random_value_for(request_id))
    }

    /// Deliver an explicit value for `request_id`.
    pub fn deliver_value(
        &self,
        raffle: &Raffle,
        request_id: RequestId,
        random_value: u64,
    ) -> Result<ParticipantId> {
        if !self.lock().outstanding.contains_key(&request_id) {
            return Err(RaffleError::ProviderError("nonexistent request".into()));
        }

        // The provider lock is released before calling back into the engine.
        let result = raffle.fulfill_randomness(request_id, random_value);
        match &result {
            Ok(_) | Err(RaffleError::UnknownRequestId(_)) => {
                self.lock().outstanding.remove(&request_id);
            }
            Err(_) => {}
        }
        result
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LocalVrfState> {
        // Every mutation is a single insert/remove, so a poisoned guard is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RandomnessProvider for LocalVrfProvider {
    fn request_randomness(&self, num_words: u32) -> Result<RequestId> {
        let mut state = self.lock();
        let id = state.next_id.checked_add(1).ok_or(RaffleError::Overflow)?;
        state.next_id = id;
        let request_id = RequestId(id);
        state.outstanding.insert(request_id, num_words);
        debug!(request_id = %request_id, num_words, "local vrf request opened");
        Ok(request_id)
    }

    fn request_confirmations(&self) -> u16 {
        self.confirmations
    }

    fn cancel_request(&self, request_id: RequestId) {
        if self.lock().outstanding.remove(&request_id).is_some() {
            debug!(request_id = %request_id, "local vrf request cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_holds_one_request_and_consumes_once() {
        let mut tracker = RequestTracker::new();
        tracker.open(RequestId(1), 10).unwrap();
        assert!(tracker.matches(RequestId(1)));
        assert_eq!(
            tracker.open(RequestId(2), 11),
            Err(RaffleError::CapacityExceeded { capacity: 1 })
        );

        let pending = tracker.consume(RequestId(1)).unwrap();
        assert_eq!(pending.issued_at, 10);
        assert_eq!(
            tracker.consume(RequestId(1)),
            Err(RaffleError::UnknownRequestId(RequestId(1)))
        );
        assert!(tracker.is_empty());
    }

    #[test]
    fn tracker_rejects_reissued_id() {
        let mut tracker = RequestTracker::new();
        tracker.open(RequestId(4), 0).unwrap();
        assert!(matches!(
            tracker.open(RequestId(4), 1),
            Err(RaffleError::ProviderError(_))
        ));
        assert_eq!(tracker.pending().map(|p| p.issued_at), Some(0));
    }

    #[test]
    fn tracker_refuses_to_reopen_consumed_id() {
        let mut tracker = RequestTracker::new();
        tracker.open(RequestId(1), 0).unwrap();
        tracker.consume(RequestId(1)).unwrap();
        assert!(tracker.was_consumed(RequestId(1)));

        assert_eq!(
            tracker.open(RequestId(1), 5),
            Err(RaffleError::ProviderError(
                "provider reissued request id 1".into()
            ))
        );
        assert!(tracker.is_empty());
        assert!(!tracker.matches(RequestId(1)));
    }

    #[test]
    fn consumed_history_is_bounded() {
        let mut tracker = RequestTracker::new();
        let total = CONSUMED_REQUEST_HISTORY as u64 + 1;
        for id in 1..=total {
            tracker.open(RequestId(id), id).unwrap();
            tracker.consume(RequestId(id)).unwrap();
        }
        assert!(!tracker.was_consumed(RequestId(1)));
        assert!(tracker.was_consumed(RequestId(2)));
        assert!(tracker.was_consumed(RequestId(total)));
    }

    #[test]
    fn cancelled_request_is_no_longer_outstanding() {
        let vrf = LocalVrfProvider::new(3);
        let id = vrf.request_randomness(1).unwrap();
        vrf.cancel_request(id);
        assert!(vrf.outstanding().is_empty());
    }

    #[test]
    fn local_provider_issues_increasing_nonzero_ids() {
        let vrf = LocalVrfProvider::new(9);
        let a = vrf.request_randomness(1).unwrap();
        let b = vrf.request_randomness(1).unwrap();
        assert_eq!(a, RequestId(1));
        assert_eq!(b, RequestId(2));
        assert_eq!(vrf.outstanding(), vec![a, b]);
    }

    #[test]
    fn local_provider_values_are_deterministic_per_seed() {
        let a = LocalVrfProvider::new(1);
        let b = LocalVrfProvider::new(1);
        let c = LocalVrfProvider::new(2);
        assert_eq!(a.random_value_for(RequestId(1)), b.random_value_for(RequestId(1)));
        assert_ne!(a.random_value_for(RequestId(1)), a.random_value_for(RequestId(2)));
        assert_ne!(a.random_value_for(RequestId(1)), c.random_value_for(RequestId(1)));
    }
}
