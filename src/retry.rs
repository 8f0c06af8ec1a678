//! Retry budget and exponential backoff schedule.

// self
use crate::{_prelude::*, config::duration_ms, error::ConfigError};

/// Bounded exponential backoff applied to retryable failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Retries allowed after the initial attempt.
	pub max_retries: u32,
	/// Delay before the first retry; doubles on each subsequent retry.
	#[serde(with = "duration_ms")]
	pub base_delay: Duration,
	/// Multiplier applied to `max_retries` for force-refresh requests.
	pub force_refresh_factor: u32,
}
impl RetryPolicy {
	/// Rejects factors that would disable force-refresh retries.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.force_refresh_factor == 0 {
			return Err(ConfigError::InvalidPolicy {
				reason: "force_refresh_factor must be at least 1".into(),
			});
		}

		Ok(())
	}

	/// Retry budget for a request.
	pub fn max_retries_for(&self, force_refresh: bool) -> u32 {
		if force_refresh {
			self.max_retries.saturating_mul(self.force_refresh_factor)
		} else {
			self.max_retries
		}
	}

	/// Delay before retry number `retry_count + 1` (`base_delay * 2^retry_count`).
	pub fn delay_for(&self, retry_count: u32) -> Duration {
		if self.base_delay.is_zero() {
			return Duration::ZERO;
		}

		1u32.checked_shl(retry_count)
			.and_then(|multiplier| self.base_delay.checked_mul(multiplier))
			.unwrap_or(Duration::MAX)
	}

	/// Upper bound on the total time spent sleeping between attempts.
	pub fn total_delay_bound(&self, force_refresh: bool) -> Duration {
		(0..self.max_retries_for(force_refresh))
			.fold(Duration::ZERO, |acc, retry| acc.saturating_add(self.delay_for(retry)))
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { max_retries: 3, base_delay: Duration::from_secs(2), force_refresh_factor: 2 }
	}
}
