//! [`Transport`] that forwards requests through a [`Bridge`] to a privileged worker.

// self
use crate::{
	_prelude::*,
	config::Timeouts,
	error::TransportError,
	http::PreparedRequest,
	transport::{Bridge, BridgeMessage, RelayReply, RelayRequest, Transport, TransportFuture},
};

/// Relay transport with its own round-trip timeout.
#[derive(Clone)]
pub struct RelayTransport {
	bridge: Arc<dyn Bridge>,
	timeouts: Timeouts,
}
impl RelayTransport {
	/// Creates a relay over `bridge`; only the relay timeouts in `timeouts` are used.
	pub fn new(bridge: Arc<dyn Bridge>, timeouts: Timeouts) -> Self {
		Self { bridge, timeouts }
	}

	/// Sends `RELOAD_RESOURCES` and waits for the acknowledgement.
	pub async fn reload_resources(&self) -> Result<()> {
		let reply = self.round_trip(BridgeMessage::ReloadResources, self.timeouts.relay).await?;

		if reply.success {
			Ok(())
		} else {
			Err(TransportError::relay(
				reply.error.unwrap_or_else(|| "resource reload was refused".into()),
			)
			.into())
		}
	}

	async fn round_trip(
		&self,
		message: BridgeMessage,
		after: Duration,
	) -> Result<RelayReply, TransportError> {
		match tokio::time::timeout(after, self.bridge.send(message)).await {
			Ok(reply) => reply,
			Err(_) => Err(TransportError::Timeout { after }),
		}
	}
}
impl Transport for RelayTransport {
	fn dispatch(&self, request: PreparedRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let after = self.timeouts.relay_for(request.force_refresh);
			let message = BridgeMessage::ProxyApiRequest(RelayRequest::from(&request));
			let reply = self.round_trip(message, after).await?;

			reply.into_response().map_err(Error::from)
		})
	}
}
impl Debug for RelayTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RelayTransport").field("timeouts", &self.timeouts).finish_non_exhaustive()
	}
}
