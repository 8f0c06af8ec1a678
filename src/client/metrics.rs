// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for pipeline activity.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
	dispatches: AtomicU64,
	retries: AtomicU64,
	throttled: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl PipelineMetrics {
	/// Returns the number of requests handed to a transport.
	pub fn dispatches(&self) -> u64 {
		self.dispatches.load(Ordering::Relaxed)
	}

	/// Returns the number of backoff sleeps scheduled.
	pub fn retries(&self) -> u64 {
		self.retries.load(Ordering::Relaxed)
	}

	/// Returns the number of admissions the rate limiter delayed.
	pub fn throttled(&self) -> u64 {
		self.throttled.load(Ordering::Relaxed)
	}

	/// Returns the number of logical calls that completed successfully.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of logical calls that failed.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_dispatch(&self) {
		self.dispatches.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_retry(&self) {
		self.retries.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_throttled(&self) {
		self.throttled.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}
}
