//! Sliding-window rate limiter consulted before every outbound request.
//!
//! Two constraints are checked in order on each admission: a burst cap over the sliding window
//! and a minimum gap since the previous admission. Whenever either one says "wait", the
//! limiter sleeps and re-evaluates both. The window is guarded by an async mutex held for the
//! whole admission so concurrent callers are serialized and admitted one after another.

// std
use std::collections::VecDeque;
// crates.io
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	clock::{self, Clock},
	config::duration_ms,
	error::ConfigError,
	obs,
};

/// Throttling limits applied to outbound requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitPolicy {
	/// Length of the sliding window.
	#[serde(with = "duration_ms")]
	pub window: Duration,
	/// Maximum admissions (by weight) inside one window.
	pub max_requests: u32,
	/// Minimum gap between two admissions.
	#[serde(with = "duration_ms")]
	pub min_interval: Duration,
}
impl RateLimitPolicy {
	/// Rejects policies that could never admit a request.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_requests == 0 {
			return Err(ConfigError::InvalidPolicy { reason: "max_requests must be positive".into() });
		}
		if self.window.is_zero() {
			return Err(ConfigError::InvalidPolicy {
				reason: "rate limit window must be positive".into(),
			});
		}

		Ok(())
	}
}
impl Default for RateLimitPolicy {
	fn default() -> Self {
		Self {
			window: Duration::from_secs(60),
			max_requests: 30,
			min_interval: Duration::from_secs(2),
		}
	}
}

/// Why the limiter asked a caller to wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DelayReason {
	/// The window already holds the maximum number of admissions.
	BurstCap,
	/// The previous admission happened less than the minimum gap ago.
	MinInterval,
}
impl DelayReason {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::BurstCap => "burst_cap",
			Self::MinInterval => "min_interval",
		}
	}
}

/// Result of a single admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed immediately.
	Allow,
	/// The request should wait before re-checking.
	Delay {
		/// Time to wait before the next check.
		wait: Duration,
		/// Constraint that triggered the delay.
		reason: DelayReason,
	},
}

/// One admitted request inside the sliding window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestRecord {
	/// Admission instant.
	pub at: Instant,
	/// Budget consumed by the request.
	pub weight: u32,
}

#[derive(Debug, Default)]
struct Window {
	records: VecDeque<RequestRecord>,
	last_request: Option<Instant>,
}
impl Window {
	fn evict(&mut self, window: Duration, now: Instant) {
		while self.records.front().is_some_and(|r| now.saturating_duration_since(r.at) >= window) {
			self.records.pop_front();
		}
	}

	fn used(&self) -> u32 {
		self.records.iter().map(|r| r.weight).sum()
	}

	fn evaluate(&mut self, policy: &RateLimitPolicy, now: Instant) -> RateLimitDecision {
		self.evict(policy.window, now);

		if self.used() >= policy.max_requests
			&& let Some(oldest) = self.records.front()
		{
			let wait = (oldest.at + policy.window).saturating_duration_since(now);

			if !wait.is_zero() {
				return RateLimitDecision::Delay { wait, reason: DelayReason::BurstCap };
			}
		}
		if let Some(last) = self.last_request {
			let since = now.saturating_duration_since(last);

			if since < policy.min_interval {
				return RateLimitDecision::Delay {
					wait: policy.min_interval - since,
					reason: DelayReason::MinInterval,
				};
			}
		}

		RateLimitDecision::Allow
	}

	fn record(&mut self, now: Instant) {
		self.records.push_back(RequestRecord { at: now, weight: 1 });
		self.last_request = Some(now);
	}
}

/// Shared admission gate; clones share the same window.
#[derive(Clone, Debug)]
pub struct RateLimiter {
	policy: RateLimitPolicy,
	state: Arc<AsyncMutex<Window>>,
}
impl RateLimiter {
	/// Creates an empty limiter.
	pub fn new(policy: RateLimitPolicy) -> Self {
		Self { policy, state: Default::default() }
	}

	/// Policy enforced by this limiter.
	pub fn policy(&self) -> RateLimitPolicy {
		self.policy
	}

	/// Suspends until admission is safe, records the admission, and returns the time spent
	/// waiting.
	pub async fn admit(&self, clock: &dyn Clock, cancel: &CancellationToken) -> Result<Duration> {
		let mut window = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(Error::Cancelled),
			guard = self.state.lock() => guard,
		};
		let mut waited = Duration::ZERO;

		loop {
			let now = clock.now();

			match window.evaluate(&self.policy, now) {
				RateLimitDecision::Allow => {
					window.record(now);

					return Ok(waited);
				},
				RateLimitDecision::Delay { wait, reason } => {
					obs::rate_limited(wait, reason);
					clock::sleep_or_cancel(clock, wait, cancel).await?;

					waited += wait;
				},
			}
		}
	}

	/// Number of admissions currently inside the window (without evicting).
	pub async fn in_window(&self) -> usize {
		self.state.lock().await.records.len()
	}
}
