//! Cache entry definitions and state management helpers.

// self
use crate::{
	_prelude::*,
	cache::state::{CachePayload, CacheState, FetchFailure},
	keys::KeyMaterial,
};

/// The single key material slot owned by a [`KeyStore`](crate::cache::KeyStore).
#[derive(Clone, Debug)]
pub struct CacheEntry {
	state: CacheState,
	attempts: u64,
	error_count: u32,
	last_error: Option<FetchFailure>,
}
impl CacheEntry {
	/// Create a new empty cache entry.
	pub fn new() -> Self {
		Self { state: CacheState::Empty, attempts: 0, error_count: 0, last_error: None }
	}

	/// Inspect the current cache state.
	pub fn state(&self) -> &CacheState {
		&self.state
	}

	/// Number of fetches that have finished, successful or not.
	pub fn attempts(&self) -> u64 {
		self.attempts
	}

	/// Consecutive failed fetches since the last success.
	pub fn error_count(&self) -> u32 {
		self.error_count
	}

	/// Most recent fetch failure, cleared by the next success.
	pub fn last_error(&self) -> Option<&FetchFailure> {
		self.last_error.as_ref()
	}

	/// Currently cached material, if any.
	pub fn material(&self) -> Option<Arc<KeyMaterial>> {
		self.state.payload().map(|payload| payload.material.clone())
	}

	/// Mark a fetch as started: `Empty` becomes `Loading`, `Ready` becomes `Refreshing`.
	///
	/// Returns false when a fetch is already recorded as running.
	pub fn begin_fetch(&mut self) -> bool {
		let next = match std::mem::replace(&mut self.state, CacheState::Empty) {
			CacheState::Empty => CacheState::Loading,
			CacheState::Ready(payload) => CacheState::Refreshing(payload),
			state => {
				self.state = state;

				return false;
			},
		};

		self.state = next;

		true
	}

	/// Record a successful fetch, replacing any previous material.
	pub fn fetch_success(&mut self, payload: CachePayload) {
		self.state = CacheState::Ready(payload);
		self.attempts = self.attempts.saturating_add(1);
		self.error_count = 0;
		self.last_error = None;
	}

	/// Record a failed fetch; previously cached material stays in place.
	pub fn fetch_failure(&mut self, failure: FetchFailure) {
		self.state = match std::mem::replace(&mut self.state, CacheState::Empty) {
			CacheState::Loading | CacheState::Empty => CacheState::Empty,
			CacheState::Refreshing(payload) | CacheState::Ready(payload) =>
				CacheState::Ready(payload),
		};
		self.attempts = self.attempts.saturating_add(1);
		self.error_count = self.error_count.saturating_add(1);
		self.last_error = Some(failure);
	}
}
impl Default for CacheEntry {
	fn default() -> Self {
		Self::new()
	}
}
