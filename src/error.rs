//! Client-level error types shared across the pipeline, transports, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout, relay); retried with backoff.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Stored credential is missing, malformed, or was rejected by the server.
	#[error("Credential is invalid, re-authentication is required: {reason}.")]
	AuthInvalid {
		/// Guard- or server-supplied reason string.
		reason: String,
	},
	/// Server answered 404.
	#[error("Resource not found: {url}.")]
	NotFound {
		/// Absolute URL that was requested.
		url: String,
		/// Whether the URL belongs to the extension's own resources.
		extension_resource: bool,
	},
	/// Server answered with a 5xx status.
	#[error("Server error {status}: {message}.")]
	Server {
		/// HTTP status code.
		status: u16,
		/// Server- or transport-supplied message.
		message: String,
	},
	/// Server answered with any other non-success status.
	#[error("Request failed with status {status}: {message}.")]
	Http {
		/// HTTP status code.
		status: u16,
		/// Server- or transport-supplied message.
		message: String,
	},
	/// Response body is not a well-formed object.
	#[error("Response is malformed: {reason}.")]
	MalformedResponse {
		/// Description of what was wrong with the body.
		reason: String,
	},
	/// Server returned an envelope with `status: "error"`.
	#[error("Server rejected the request: {message}.")]
	Rejected {
		/// Message carried by the envelope.
		message: String,
	},
	/// The same logical request is already pending.
	#[error("Request `{identity}` is already in progress.")]
	DuplicateInFlight {
		/// Logical request identity.
		identity: String,
	},
	/// Retryable failures persisted past the retry budget.
	#[error("Request failed after {attempts} attempts.")]
	RetriesExhausted {
		/// Number of dispatches performed.
		attempts: u32,
		/// Failure observed on the final attempt.
		#[source]
		last: Box<Error>,
	},
	/// Trading symbol cannot be normalized.
	#[error("Symbol `{symbol}` is invalid.")]
	InvalidSymbol {
		/// Raw symbol supplied by the caller.
		symbol: String,
	},
	/// Caller cancelled the request.
	#[error("Request was cancelled.")]
	Cancelled,
}
impl Error {
	/// Returns `true` for failures the retry loop may repeat.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Transport(_) | Self::Server { .. } => true,
			Self::NotFound { extension_resource, .. } => *extension_resource,
			_ => false,
		}
	}

	/// Returns `true` for 404s on extension-owned resources.
	pub fn is_extension_resource_miss(&self) -> bool {
		matches!(self, Self::NotFound { extension_resource: true, .. })
	}

	/// Returns `true` when the caller must log in again.
	pub fn requires_reauth(&self) -> bool {
		matches!(self, Self::AuthInvalid { .. })
	}

	/// Short label suitable for span or metric fields.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Storage(_) => "storage",
			Self::Config(_) => "config",
			Self::Transport(_) => "transport",
			Self::AuthInvalid { .. } => "auth_invalid",
			Self::NotFound { .. } => "not_found",
			Self::Server { .. } => "server",
			Self::Http { .. } => "http",
			Self::MalformedResponse { .. } => "malformed_response",
			Self::Rejected { .. } => "rejected",
			Self::DuplicateInFlight { .. } => "duplicate_in_flight",
			Self::RetriesExhausted { .. } => "retries_exhausted",
			Self::InvalidSymbol { .. } => "invalid_symbol",
			Self::Cancelled => "cancelled",
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot be parsed or cannot act as a base.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint path cannot be joined onto the base URL.
	#[error("Endpoint path `{path}` cannot be resolved.")]
	InvalidEndpoint {
		/// Relative endpoint path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Configuration document could not be parsed.
	#[error("Configuration document is invalid.")]
	Parse(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// Configuration file could not be read.
	#[error("Configuration file could not be read.")]
	Io(#[from] std::io::Error),
	/// A policy value is out of range.
	#[error("Invalid configuration: {reason}.")]
	InvalidPolicy {
		/// Description of the offending value.
		reason: String,
	},
	/// No transport is available for the current build.
	#[error("No HTTP transport is configured.")]
	MissingTransport,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, timeout, relay).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// No response arrived within the allowed time.
	#[error("No response within {after:?}.")]
	Timeout {
		/// Timeout that elapsed.
		after: Duration,
	},
	/// Background relay could not deliver the request or reported a failure.
	#[error("Relay failed: {message}.")]
	Relay {
		/// Relay-supplied failure description.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Builds a relay failure from any message.
	pub fn relay(message: impl Into<String>) -> Self {
		Self::Relay { message: message.into() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
