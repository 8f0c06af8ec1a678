// self
use crate::{_prelude::*, auth::TokenScheme, limiter::DelayReason, obs::CallKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by pipeline calls.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + stage.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("cooltrade_api.call", call = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event when the limiter delays an admission.
pub fn rate_limited(wait: Duration, reason: DelayReason) {
	#[cfg(feature = "tracing")]
	tracing::debug!(wait_ms = wait.as_millis() as u64, reason = reason.as_str(), "rate limited");
	#[cfg(not(feature = "tracing"))]
	let _ = (wait, reason);
}

/// Emits a debug event when a stored credential gained its missing scheme prefix.
pub fn credential_repaired(scheme: TokenScheme) {
	#[cfg(feature = "tracing")]
	tracing::debug!(scheme = scheme.prefix().trim_end(), "credential repaired");
	#[cfg(not(feature = "tracing"))]
	let _ = scheme;
}

/// Emits a warning when a retryable failure schedules another attempt.
pub fn retry_scheduled(retry: u32, delay: Duration, error: &Error) {
	#[cfg(feature = "tracing")]
	tracing::warn!(retry, delay_ms = delay.as_millis() as u64, error = %error, "retrying request");
	#[cfg(not(feature = "tracing"))]
	let _ = (retry, delay, error);
}

/// Emits a warning when the session is cleared after an authentication failure.
pub fn session_cleared(reason: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(reason, "session cleared");
	#[cfg(not(feature = "tracing"))]
	let _ = reason;
}
