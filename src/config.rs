//! Client configuration: endpoint base, timeouts, retry budget, rate limits, and credential
//! policy.
//!
//! Every field has a default matching the production API, so `ClientConfig::default()` is a
//! working configuration. Documents are JSON with durations expressed in milliseconds:
//!
//! ```json
//! { "base_url": "https://www.cooltrade.xyz/api/", "retry": { "max_retries": 5 } }
//! ```

// std
use std::path::Path;
// self
use crate::{
	_prelude::*,
	api::Language,
	auth::TokenPolicy,
	error::ConfigError,
	limiter::RateLimitPolicy,
	retry::RetryPolicy,
};

/// Production API base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.cooltrade.xyz/api/";

/// Top-level client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
	/// Base URL every endpoint path is resolved against.
	pub base_url: String,
	/// Origin of the extension's own resources (e.g. `chrome-extension://<id>/`).
	///
	/// 404s on URLs under this origin trigger a resource reload before retrying.
	pub extension_origin: Option<String>,
	/// Request and relay timeouts.
	pub timeouts: Timeouts,
	/// Retry budget and backoff.
	pub retry: RetryPolicy,
	/// Outbound request throttling.
	pub rate_limit: RateLimitPolicy,
	/// Stored credential validation rules.
	pub token: TokenPolicy,
	/// Report language used when none is stored.
	pub default_language: Language,
}
impl ClientConfig {
	/// Parses a JSON document and validates the result.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(de)?;

		config.validate()?;

		Ok(config)
	}

	/// Reads and parses a JSON document from disk.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let raw = std::fs::read_to_string(path)?;

		Self::from_json_str(&raw)
	}

	/// Checks that URLs parse and that policies are usable.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.base()?;

		if let Some(origin) = &self.extension_origin {
			Url::parse(origin).map_err(|source| ConfigError::InvalidBaseUrl { source })?;
		}

		self.rate_limit.validate()?;
		self.retry.validate()?;

		if self.timeouts.request.is_zero() || self.timeouts.relay.is_zero() {
			return Err(ConfigError::InvalidPolicy { reason: "timeouts must be positive".into() });
		}

		Ok(())
	}

	/// Overrides the base URL.
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();

		self
	}

	/// Declares the origin of extension-owned resources.
	pub fn with_extension_origin(mut self, origin: impl Into<String>) -> Self {
		self.extension_origin = Some(origin.into());

		self
	}

	/// Overrides request and relay timeouts.
	pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
		self.timeouts = timeouts;

		self
	}

	/// Overrides the retry policy.
	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Overrides the rate limit policy.
	pub fn with_rate_limit(mut self, rate_limit: RateLimitPolicy) -> Self {
		self.rate_limit = rate_limit;

		self
	}

	/// Overrides the credential policy.
	pub fn with_token_policy(mut self, token: TokenPolicy) -> Self {
		self.token = token;

		self
	}

	/// Overrides the fallback report language.
	pub fn with_default_language(mut self, language: Language) -> Self {
		self.default_language = language;

		self
	}

	/// Resolves `path` against the base URL and appends `query`.
	pub fn endpoint_url(&self, path: &str, query: &[(String, String)]) -> Result<Url, ConfigError> {
		let base = self.base()?;
		let mut url = base
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidEndpoint { path: path.to_owned(), source })?;

		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
		}

		Ok(url)
	}

	/// Returns `true` when `url` points at an extension-owned resource.
	pub fn is_extension_resource(&self, url: &Url) -> bool {
		self.extension_origin
			.as_deref()
			.is_some_and(|origin| !origin.is_empty() && url.as_str().starts_with(origin))
	}

	fn base(&self) -> Result<Url, ConfigError> {
		let mut base =
			Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidBaseUrl { source })?;

		if base.cannot_be_a_base() {
			return Err(ConfigError::InvalidBaseUrl {
				source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
			});
		}
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		Ok(base)
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_BASE_URL.into(),
			extension_origin: None,
			timeouts: Timeouts::default(),
			retry: RetryPolicy::default(),
			rate_limit: RateLimitPolicy::default(),
			token: TokenPolicy::default(),
			default_language: Language::default(),
		}
	}
}

/// Per-request and relay timeouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
	/// Timeout for ordinary requests.
	#[serde(with = "duration_ms")]
	pub request: Duration,
	/// Timeout for requests carrying `force_refresh=true`.
	#[serde(with = "duration_ms")]
	pub force_refresh: Duration,
	/// Relay round-trip timeout for ordinary requests.
	#[serde(with = "duration_ms")]
	pub relay: Duration,
	/// Relay round-trip timeout for force-refresh requests.
	#[serde(with = "duration_ms")]
	pub relay_force_refresh: Duration,
}
impl Timeouts {
	/// Transport timeout for a request.
	pub const fn request_for(&self, force_refresh: bool) -> Duration {
		if force_refresh { self.force_refresh } else { self.request }
	}

	/// Relay timeout for a request.
	pub const fn relay_for(&self, force_refresh: bool) -> Duration {
		if force_refresh { self.relay_force_refresh } else { self.relay }
	}
}
impl Default for Timeouts {
	fn default() -> Self {
		Self {
			request: Duration::from_secs(30),
			force_refresh: Duration::from_secs(60),
			relay: Duration::from_secs(30),
			relay_force_refresh: Duration::from_secs(120),
		}
	}
}

/// Serializes [`Duration`] values as whole milliseconds.
pub(crate) mod duration_ms {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}
