//! The API client: one object owning the limiter, credential guard, transports, and
//! in-flight set shared by every call.

mod metrics;
mod pipeline;

pub use metrics::PipelineMetrics;

// self
use crate::{
	_prelude::*,
	auth::TokenGuard,
	clock::{Clock, TokioClock},
	config::ClientConfig,
	dedup::InFlightSet,
	limiter::RateLimiter,
	store::CredentialStore,
	transport::{Bridge, Environment, RelayTransport, Transport, TransportSelector},
};
#[cfg(feature = "reqwest")] use crate::transport::ReqwestTransport;

/// Receives session lifecycle notifications from the pipeline.
pub trait SessionObserver
where
	Self: Send + Sync,
{
	/// Called after the session was cleared because the credential is unusable.
	fn reauth_required(&self, reason: &str);
}

/// Observer that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;
impl SessionObserver for NoopObserver {
	fn reauth_required(&self, _: &str) {}
}

/// Resilient API client.
///
/// Every call runs token guard, rate limiter, transport, and retry loop in that order. Clones
/// share the limiter window, the in-flight set, the store, and the metrics, so one client
/// should be created per process and cloned into tasks.
#[derive(Clone)]
pub struct ApiClient {
	config: Arc<ClientConfig>,
	transport: TransportSelector,
	store: Arc<dyn CredentialStore>,
	guard: TokenGuard,
	limiter: RateLimiter,
	in_flight: InFlightSet,
	clock: Arc<dyn Clock>,
	observer: Arc<dyn SessionObserver>,
	metrics: Arc<PipelineMetrics>,
}
impl ApiClient {
	/// Creates a client that sends requests through `transport`.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		transport: Arc<dyn Transport>,
	) -> Result<Self> {
		config.validate()?;

		Ok(Self {
			guard: TokenGuard::new(store.clone(), config.token),
			limiter: RateLimiter::new(config.rate_limit),
			transport: TransportSelector::direct(transport),
			config: Arc::new(config),
			store,
			in_flight: Default::default(),
			clock: Arc::new(TokioClock),
			observer: Arc::new(NoopObserver),
			metrics: Default::default(),
		})
	}

	/// Attaches a background relay; every request is then forwarded through `bridge`.
	pub fn with_bridge(mut self, bridge: Arc<dyn Bridge>) -> Self {
		self.transport = self.transport.with_relay(RelayTransport::new(bridge, self.config.timeouts));

		self
	}

	/// Replaces the time source used by the limiter and the backoff.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Registers the observer notified when the session must be re-established.
	pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
		self.observer = observer;

		self
	}

	/// Active configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Credential store shared with the guard.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		&self.store
	}

	/// Token guard consulted before authenticated requests.
	pub fn guard(&self) -> &TokenGuard {
		&self.guard
	}

	/// Shared rate limiter.
	pub fn limiter(&self) -> &RateLimiter {
		&self.limiter
	}

	/// Logical requests currently in flight.
	pub fn in_flight(&self) -> &InFlightSet {
		&self.in_flight
	}

	/// Pipeline counters.
	pub fn metrics(&self) -> &Arc<PipelineMetrics> {
		&self.metrics
	}

	/// Environment detected from the attached transports.
	pub fn environment(&self) -> Environment {
		self.transport.environment()
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
		let transport = ReqwestTransport::new()?;

		Self::with_transport(config, store, Arc::new(transport))
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url)
			.field("transport", &self.transport)
			.field("limiter", &self.limiter.policy())
			.finish_non_exhaustive()
	}
}
