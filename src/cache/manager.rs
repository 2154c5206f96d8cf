//! Key store handling lazy key material retrieval, single-flight refreshes, and readiness.

// crates.io
use serde::{Deserialize, Serialize};
use tokio::{
	sync::{Mutex, RwLock},
	task::JoinHandle,
};
// self
use crate::{
	_prelude::*,
	cache::{
		entry::CacheEntry,
		state::{CachePayload, CacheState, FetchFailure},
	},
	config::KeySources,
	http::{KeyFetcher, client::HttpKeyFetcher},
	keys::KeyMaterial,
	metrics::{self, StoreMetrics, StoreMetricsSnapshot},
};

/// Owns the current key material and coordinates fetching it.
///
/// Material is fetched lazily on the first lookup that finds the cache empty, or on an explicit
/// [`KeyStore::refresh`]. Concurrent fetch triggers are serialised by a single-flight guard; a
/// caller that waited while another fetch succeeded returns that result instead of fetching
/// again. A failed fetch never replaces material that is already cached.
#[derive(Clone, Debug)]
pub struct KeyStore {
	fetcher: Arc<dyn KeyFetcher>,
	entry: Arc<RwLock<CacheEntry>>,
	single_flight: Arc<Mutex<()>>,
	metrics: Arc<StoreMetrics>,
}
impl KeyStore {
	/// Build a store backed by the given fetcher.
	pub fn new(fetcher: impl KeyFetcher + 'static) -> Self {
		Self::with_fetcher(Arc::new(fetcher))
	}

	/// Build a store around a shared fetcher (primarily for tests).
	pub fn with_fetcher(fetcher: Arc<dyn KeyFetcher>) -> Self {
		Self {
			fetcher,
			entry: Arc::new(RwLock::new(CacheEntry::new())),
			single_flight: Arc::new(Mutex::new(())),
			metrics: StoreMetrics::new(),
		}
	}

	/// Build a store that fetches over HTTP from the configured sources.
	pub fn from_sources(sources: KeySources) -> Result<Self> {
		Ok(Self::new(HttpKeyFetcher::new(sources)?))
	}

	/// Access the store metrics accumulator.
	pub fn metrics(&self) -> Arc<StoreMetrics> {
		self.metrics.clone()
	}

	/// Currently cached material, without performing any I/O.
	pub async fn get(&self) -> Option<Arc<KeyMaterial>> {
		self.entry.read().await.material()
	}

	/// Return cached material, fetching and waiting for it when the cache is empty.
	#[tracing::instrument(skip(self))]
	pub async fn ensure(&self) -> Result<Arc<KeyMaterial>> {
		let (material, attempts) = {
			let entry = self.entry.read().await;

			(entry.material(), entry.attempts())
		};

		if let Some(material) = material {
			self.observe_lookup(true);

			return Ok(material);
		}

		self.observe_lookup(false);

		tracing::debug!("cache empty; fetching key material");

		self.fetch_after(attempts).await
	}

	/// Fetch fresh material and replace the cached value on success.
	#[tracing::instrument(skip(self))]
	pub async fn refresh(&self) -> Result<Arc<KeyMaterial>> {
		let attempts = { self.entry.read().await.attempts() };

		self.fetch_after(attempts).await
	}

	/// Start a fetch in the background without waiting for it.
	///
	/// Failures are logged and surface through [`KeyStore::status`]; the next lookup retries.
	pub fn spawn_initial_fetch(&self) -> JoinHandle<()> {
		let store = self.clone();

		tokio::spawn(async move {
			if let Err(err) = store.ensure().await {
				tracing::warn!(error = %err, "initial key material fetch failed; lookups will retry");
			}
		})
	}

	/// Capture the current cache state for health reporting.
	pub async fn status(&self) -> StoreStatus {
		let entry = { self.entry.read().await.clone() };

		StoreStatus::from_components(&entry, self.metrics.snapshot())
	}

	// Fetches run detached so a dropped caller cannot leave the entry stuck in `Loading`.
	async fn fetch_after(&self, observed: u64) -> Result<Arc<KeyMaterial>> {
		let store = self.clone();

		tokio::spawn(async move { store.fetch_blocking(observed).await }).await.map_err(|err| {
			Error::KeyAcquisition {
				resource: "key material",
				reason: format!("Fetch task failed: {err}."),
			}
		})?
	}

	async fn fetch_blocking(&self, observed: u64) -> Result<Arc<KeyMaterial>> {
		let _guard = self.single_flight.lock().await;

		{
			let mut entry = self.entry.write().await;

			// A fetch finished while this caller queued; share its outcome.
			if entry.attempts() != observed {
				if let Some(material) = entry.material() {
					tracing::debug!("joined a concurrent fetch");

					return Ok(material);
				}
				if let Some(failure) = entry.last_error() {
					tracing::debug!("joined a concurrent failed fetch");

					return Err(Error::KeyAcquisition {
						resource: "key material",
						reason: format!("Concurrent fetch failed: {}", failure.reason),
					});
				}
			}

			entry.begin_fetch();
		}

		let started = Instant::now();

		match self.fetcher.fetch().await {
			Ok(material) => {
				let material = Arc::new(material);
				let previous = {
					let mut entry = self.entry.write().await;
					let previous = entry.material();

					entry.fetch_success(CachePayload {
						material: material.clone(),
						fetched_at: Utc::now(),
					});

					previous
				};

				self.observe_fetch_success(started.elapsed());

				if previous.as_deref().map(KeyMaterial::key_id) != Some(material.key_id()) {
					tracing::info!(kid = %material.key_id(), "key material loaded");
				}

				Ok(material)
			},
			Err(err) => {
				{
					let mut entry = self.entry.write().await;

					entry.fetch_failure(FetchFailure { reason: err.to_string(), at: Utc::now() });
				}

				self.observe_fetch_error();

				tracing::warn!(error = %err, "key material fetch failed; keeping cached state");

				Err(err)
			},
		}
	}

	fn observe_lookup(&self, hit: bool) {
		metrics::record_cache_lookup(hit);

		self.metrics.record_lookup(hit);
	}

	fn observe_fetch_success(&self, duration: Duration) {
		metrics::record_fetch_success(duration);

		self.metrics.record_fetch_success(duration);
	}

	fn observe_fetch_error(&self) {
		metrics::record_fetch_error();

		self.metrics.record_fetch_error();
	}
}

/// Public representation of the store lifecycle state.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum StoreState {
	/// No material is cached yet.
	Empty,
	/// Initial fetch is currently running.
	Loading,
	/// Material is available.
	Ready,
	/// Material is available while a fetch replaces it.
	Refreshing,
}

/// Health and readiness projection of a [`KeyStore`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
	/// Lifecycle state.
	pub state: StoreState,
	/// Whether key-dependent requests can be served without a fetch.
	pub ready: bool,
	/// Identifier of the cached public key.
	pub key_id: Option<String>,
	/// Timestamp of the most recent successful fetch.
	pub last_refresh: Option<DateTime<Utc>>,
	/// Rendered error of the most recent failed fetch since the last success.
	pub last_error: Option<String>,
	/// Timestamp of that failure.
	pub last_error_at: Option<DateTime<Utc>>,
	/// Consecutive failed fetches.
	pub error_count: u32,
	/// Lifetime count of successful fetches.
	pub fetch_successes: u64,
	/// Lifetime count of failed fetches.
	pub fetch_errors: u64,
	/// Ratio of lookups served from the cache.
	pub hit_rate: f64,
}
impl StoreStatus {
	fn from_components(entry: &CacheEntry, metrics: StoreMetricsSnapshot) -> Self {
		let state = match entry.state() {
			CacheState::Empty => StoreState::Empty,
			CacheState::Loading => StoreState::Loading,
			CacheState::Ready(_) => StoreState::Ready,
			CacheState::Refreshing(_) => StoreState::Refreshing,
		};
		let payload = entry.state().payload();

		Self {
			state,
			ready: entry.state().is_usable(),
			key_id: payload.map(|payload| payload.material.key_id().to_owned()),
			last_refresh: payload.map(|payload| payload.fetched_at),
			last_error: entry.last_error().map(|failure| failure.reason.clone()),
			last_error_at: entry.last_error().map(|failure| failure.at),
			error_count: entry.error_count(),
			fetch_successes: metrics.fetch_successes,
			fetch_errors: metrics.fetch_errors,
			hit_rate: metrics.hit_rate(),
		}
	}
}
