//! Time source used by the rate limiter and the retry loop.
//!
//! The client never calls `tokio::time` directly for scheduling decisions; it goes through a
//! [`Clock`] so tests can substitute their own notion of time. [`TokioClock`] follows the tokio
//! timer, which means `#[tokio::test(start_paused = true)]` drives it deterministically.

// crates.io
use tokio::time::Instant;
// self
use crate::_prelude::*;

/// Boxed future returned by [`Clock::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Monotonic time source with an async sleep primitive.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> Instant;

	/// Suspends the caller for `duration`.
	fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// [`Clock`] backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;
impl Clock for TokioClock {
	fn now(&self) -> Instant {
		Instant::now()
	}

	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		Box::pin(tokio::time::sleep(duration))
	}
}

/// Sleeps on `clock` unless `cancel` fires first.
pub async fn sleep_or_cancel(
	clock: &dyn Clock,
	duration: Duration,
	cancel: &CancellationToken,
) -> Result<()> {
	if duration.is_zero() {
		return if cancel.is_cancelled() { Err(Error::Cancelled) } else { Ok(()) };
	}

	tokio::select! {
		biased;
		_ = cancel.cancelled() => Err(Error::Cancelled),
		_ = clock.sleep(duration) => Ok(()),
	}
}
