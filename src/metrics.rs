//! Metrics helpers and per-store telemetry bookkeeping.

// std
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "prometheus")] use std::sync::OnceLock;
// crates.io
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
// self
use crate::_prelude::*;

const METRIC_CACHE_LOOKUPS_TOTAL: &str = "key_issuer_cache_lookups_total";
const METRIC_FETCH_TOTAL: &str = "key_issuer_fetch_total";
const METRIC_FETCH_DURATION: &str = "key_issuer_fetch_duration_seconds";
const METRIC_FETCH_ERRORS: &str = "key_issuer_fetch_errors_total";
const METRIC_TOKENS_ISSUED: &str = "key_issuer_tokens_issued_total";

/// Handle set by [`install_default_exporter`].
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Thread-safe metrics accumulator for a key store.
#[derive(Debug, Default)]
pub struct StoreMetrics {
	lookups: AtomicU64,
	cache_hits: AtomicU64,
	fetch_successes: AtomicU64,
	fetch_errors: AtomicU64,
	last_fetch_micros: AtomicU64,
}
impl StoreMetrics {
	/// Create a zeroed accumulator.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Record a cache lookup outcome.
	pub fn record_lookup(&self, hit: bool) {
		self.lookups.fetch_add(1, Ordering::Relaxed);

		if hit {
			self.cache_hits.fetch_add(1, Ordering::Relaxed);
		}
	}

	/// Record a successful fetch and its latency.
	pub fn record_fetch_success(&self, duration: Duration) {
		self.fetch_successes.fetch_add(1, Ordering::Relaxed);
		self.last_fetch_micros.store(duration.as_micros() as u64, Ordering::Relaxed);
	}

	/// Record a failed fetch.
	pub fn record_fetch_error(&self) {
		self.fetch_errors.fetch_add(1, Ordering::Relaxed);
	}

	/// Copy the current counter values.
	pub fn snapshot(&self) -> StoreMetricsSnapshot {
		StoreMetricsSnapshot {
			lookups: self.lookups.load(Ordering::Relaxed),
			cache_hits: self.cache_hits.load(Ordering::Relaxed),
			fetch_successes: self.fetch_successes.load(Ordering::Relaxed),
			fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
			last_fetch_micros: match self.last_fetch_micros.load(Ordering::Relaxed) {
				0 => None,
				value => Some(value),
			},
		}
	}
}

/// Read-only snapshot of store telemetry counters.
#[derive(Clone, Debug)]
pub struct StoreMetricsSnapshot {
	/// Lookups observed.
	pub lookups: u64,
	/// Lookups answered without a fetch.
	pub cache_hits: u64,
	/// Count of successful fetches.
	pub fetch_successes: u64,
	/// Count of failed fetches.
	pub fetch_errors: u64,
	/// Microsecond latency of the most recent successful fetch.
	pub last_fetch_micros: Option<u64>,
}
impl StoreMetricsSnapshot {
	/// Ratio of lookups served without fetching.
	pub fn hit_rate(&self) -> f64 {
		if self.lookups == 0 { 0.0 } else { self.cache_hits as f64 / self.lookups as f64 }
	}
}

/// Install a Prometheus recorder as the global `metrics` recorder.
///
/// Calls after the first successful install do nothing.
#[cfg(feature = "prometheus")]
pub fn install_default_exporter() -> Result<()> {
	if PROMETHEUS_HANDLE.get().is_some() {
		return Ok(());
	}

	let handle = PrometheusBuilder::new()
		.install_recorder()
		.map_err(|err| Error::Metrics(err.to_string()))?;
	let _ = PROMETHEUS_HANDLE.set(handle);

	Ok(())
}

/// Prometheus handle, if an exporter was installed.
#[cfg(feature = "prometheus")]
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
	PROMETHEUS_HANDLE.get()
}

/// Record a cache lookup, tagging whether it was served without a fetch.
pub fn record_cache_lookup(hit: bool) {
	let outcome = if hit { "hit" } else { "miss" };

	metrics::counter!(METRIC_CACHE_LOOKUPS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a successful fetch along with its latency.
pub fn record_fetch_success(duration: Duration) {
	metrics::counter!(METRIC_FETCH_TOTAL, "status" => "success").increment(1);
	metrics::histogram!(METRIC_FETCH_DURATION).record(duration.as_secs_f64());
}

/// Record a failed fetch.
pub fn record_fetch_error() {
	metrics::counter!(METRIC_FETCH_TOTAL, "status" => "error").increment(1);
	metrics::counter!(METRIC_FETCH_ERRORS).increment(1);
}

/// Record a signed token.
pub fn record_token_issued() {
	metrics::counter!(METRIC_TOKENS_ISSUED).increment(1);
}
