//! Cache state machine modelling the key material lifecycle.

// self
use crate::{_prelude::*, keys::KeyMaterial};

/// Key material retained by the cache together with its provenance.
#[derive(Clone, Debug)]
pub struct CachePayload {
	/// Material from the most recent successful fetch.
	pub material: Arc<KeyMaterial>,
	/// UTC timestamp of that fetch.
	pub fetched_at: DateTime<Utc>,
}

/// Most recent fetch failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchFailure {
	/// Rendered error.
	pub reason: String,
	/// UTC timestamp of the failure.
	pub at: DateTime<Utc>,
}

/// Cache lifecycle states.
#[derive(Clone, Debug)]
pub enum CacheState {
	/// No material has been fetched and no fetch is running.
	Empty,
	/// Initial fetch is underway and no material is yet available.
	Loading,
	/// Material is ready for use.
	Ready(CachePayload),
	/// Material is in use while a fetch replaces it.
	Refreshing(CachePayload),
}
impl CacheState {
	/// Retrieve the current payload if available.
	pub fn payload(&self) -> Option<&CachePayload> {
		match self {
			CacheState::Ready(payload) | CacheState::Refreshing(payload) => Some(payload),
			_ => None,
		}
	}

	/// Whether the cached payload is immediately usable.
	pub fn is_usable(&self) -> bool {
		matches!(self, CacheState::Ready(_) | CacheState::Refreshing(_))
	}
}
