//! Optional observability helpers for pipeline calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `cooltrade_api.call` with the `call`
//!   (endpoint kind) and `stage` (call site) fields, plus events for throttling, retries,
//!   credential repair, and session clearing.
//! - Enable `metrics` to increment the `cooltrade_api_call_total` counter for every
//!   attempt/retry/success/failure, labeled by `call` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Endpoint families observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Authentication endpoints.
	Auth,
	/// Technical-indicator snapshots.
	Indicators,
	/// Latest analysis reports.
	Report,
	/// Anything issued through [`ApiClient::execute`](crate::ApiClient::execute) directly.
	Other,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::Auth => "auth",
			CallKind::Indicators => "indicators",
			CallKind::Report => "report",
			CallKind::Other => "other",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// A dispatch was attempted.
	Attempt,
	/// A retryable failure scheduled another attempt.
	Retry,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Retry => "retry",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
