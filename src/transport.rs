//! Transports that carry a [`PreparedRequest`] to the API and the selector that picks one.
//!
//! A plain process talks to the API directly. A sandboxed context (one that cannot make
//! cross-origin calls itself) attaches a [`Bridge`] to a privileged background worker, and
//! every request is relayed through it instead. Both paths produce the same [`ApiResponse`]
//! and [`TransportError`](crate::error::TransportError) shapes.

pub mod bridge;
#[cfg(feature = "reqwest")] pub mod direct;
pub mod relay;

pub use bridge::*;
#[cfg(feature = "reqwest")] pub use direct::ReqwestTransport;
pub use relay::RelayTransport;

// self
use crate::{
	_prelude::*,
	http::{ApiResponse, PreparedRequest},
};

/// Boxed future returned by [`Transport::dispatch`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse>> + 'a + Send>>;

/// Executes one prepared request and returns the raw response.
///
/// Implementations report connection problems, timeouts, and relay failures as
/// [`Error::Transport`]; any HTTP status (including 4xx/5xx) is returned as a response and
/// classified by the pipeline.
pub trait Transport
where
	Self: Send + Sync,
{
	/// Sends `request`.
	fn dispatch(&self, request: PreparedRequest) -> TransportFuture<'_>;
}
impl<T> Transport for Arc<T>
where
	T: ?Sized + Transport,
{
	fn dispatch(&self, request: PreparedRequest) -> TransportFuture<'_> {
		(**self).dispatch(request)
	}
}

/// Execution context detected from the attached transports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Environment {
	/// A privileged relay is attached; requests go through it.
	Privileged,
	/// Plain context; requests go out directly.
	Web,
}
impl Environment {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Privileged => "privileged",
			Self::Web => "web",
		}
	}
}

/// Routes each request to the relay when one is attached, otherwise to the direct transport.
#[derive(Clone)]
pub struct TransportSelector {
	direct: Arc<dyn Transport>,
	relay: Option<RelayTransport>,
}
impl TransportSelector {
	/// Selector that always dispatches directly.
	pub fn direct(direct: Arc<dyn Transport>) -> Self {
		Self { direct, relay: None }
	}

	/// Attaches a relay, switching the selector into the privileged environment.
	pub fn with_relay(mut self, relay: RelayTransport) -> Self {
		self.relay = Some(relay);

		self
	}

	/// Detected environment.
	pub fn environment(&self) -> Environment {
		if self.relay.is_some() { Environment::Privileged } else { Environment::Web }
	}

	/// Dispatches `request` through the selected path.
	pub async fn dispatch(&self, request: PreparedRequest) -> Result<ApiResponse> {
		match &self.relay {
			Some(relay) => relay.dispatch(request).await,
			None => self.direct.dispatch(request).await,
		}
	}

	/// Asks the privileged side to reload extension resources; a no-op without a relay.
	pub async fn reload_resources(&self) -> Result<()> {
		match &self.relay {
			Some(relay) => relay.reload_resources().await,
			None => Ok(()),
		}
	}
}
impl Debug for TransportSelector {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TransportSelector")
			.field("environment", &self.environment())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::http::Method;

	struct Fixed(u16);
	impl Transport for Fixed {
		fn dispatch(&self, _: PreparedRequest) -> TransportFuture<'_> {
			let status = self.0;

			Box::pin(async move {
				Ok(ApiResponse { status, data: json!({ "via": "direct" }), ..Default::default() })
			})
		}
	}

	fn prepared() -> PreparedRequest {
		PreparedRequest {
			url: Url::parse("https://example.com/api/crypto/").expect("URL should parse."),
			method: Method::Get,
			headers: BTreeMap::new(),
			body: None,
			timeout: Duration::from_secs(30),
			force_refresh: false,
		}
	}

	#[tokio::test]
	async fn selector_without_relay_is_web_and_direct() {
		let selector = TransportSelector::direct(Arc::new(Fixed(200)));

		assert_eq!(selector.environment(), Environment::Web);

		let response = selector.dispatch(prepared()).await.expect("Dispatch should succeed.");

		assert_eq!(response.data, json!({ "via": "direct" }));
		selector.reload_resources().await.expect("Reload should be a no-op.");
	}

	#[tokio::test]
	async fn selector_with_relay_is_privileged() {
		let (bridge, relay) = BackgroundRelay::new(Arc::new(Fixed(201)));
		let worker = relay.spawn();
		let selector = TransportSelector::direct(Arc::new(Fixed(500)))
			.with_relay(RelayTransport::new(Arc::new(bridge), Default::default()));

		assert_eq!(selector.environment(), Environment::Privileged);

		let response = selector.dispatch(prepared()).await.expect("Relay should succeed.");

		assert_eq!(response.status, 201);

		drop(selector);

		let stats = worker.await.expect("Relay worker should not panic.");

		assert_eq!(stats.proxied, 1);
	}
}
