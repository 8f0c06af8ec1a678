//! Message bridge between a sandboxed context and its privileged background worker.
//!
//! Wire format (JSON):
//!
//! ```json
//! { "type": "PROXY_API_REQUEST", "data": { "url": "...", "method": "GET", "headers": {}, "body": null } }
//! { "type": "RELOAD_RESOURCES" }
//! ```
//!
//! Replies are `{success, status, statusText, headers, data}` or `{success: false, error}`.

// crates.io
use tokio::{
	sync::{mpsc, oneshot},
	task::JoinHandle,
};
// self
use crate::{
	_prelude::*,
	config::Timeouts,
	error::TransportError,
	http::{ApiResponse, FORCE_REFRESH_PARAM, Method, PreparedRequest},
	transport::Transport,
};

/// Messages understood by the background worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeMessage {
	/// Perform an API call on the sender's behalf.
	ProxyApiRequest(RelayRequest),
	/// Reload extension-owned resources after a resource 404.
	ReloadResources,
}

/// Request payload relayed to the background worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelayRequest {
	/// Absolute URL including the query string.
	pub url: String,
	/// HTTP method.
	pub method: Method,
	/// Final header set.
	#[serde(default)]
	pub headers: BTreeMap<String, String>,
	/// JSON body.
	#[serde(default)]
	pub body: Option<Value>,
}
impl From<&PreparedRequest> for RelayRequest {
	fn from(request: &PreparedRequest) -> Self {
		Self {
			url: request.url.to_string(),
			method: request.method,
			headers: request.headers.clone(),
			body: request.body.clone(),
		}
	}
}

/// Worker reply.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayReply {
	/// Whether the worker obtained an HTTP response (of any status).
	pub success: bool,
	/// HTTP status code.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<u16>,
	/// Reason phrase.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status_text: Option<String>,
	/// Response headers.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub headers: BTreeMap<String, String>,
	/// Decoded body.
	#[serde(default, skip_serializing_if = "Value::is_null")]
	pub data: Value,
	/// Failure description when `success` is `false`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}
impl RelayReply {
	/// Reply carrying an HTTP response.
	pub fn response(response: ApiResponse) -> Self {
		Self {
			success: true,
			status: Some(response.status),
			status_text: Some(response.status_text),
			headers: response.headers,
			data: response.data,
			error: None,
		}
	}

	/// Bare acknowledgement.
	pub fn ack() -> Self {
		Self { success: true, ..Default::default() }
	}

	/// Failure reply.
	pub fn failure(error: impl Into<String>) -> Self {
		Self { success: false, error: Some(error.into()), ..Default::default() }
	}

	/// Converts the reply into a response, mapping `success: false` to a relay failure.
	pub fn into_response(self) -> Result<ApiResponse, TransportError> {
		if !self.success {
			return Err(TransportError::relay(
				self.error.unwrap_or_else(|| "background relay reported a failure".into()),
			));
		}

		let status = self
			.status
			.ok_or_else(|| TransportError::relay("background relay reply carries no status"))?;

		Ok(ApiResponse {
			status,
			status_text: self.status_text.unwrap_or_default(),
			headers: self.headers,
			data: self.data,
		})
	}
}

/// Boxed future returned by [`Bridge::send`].
pub type BridgeFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RelayReply, TransportError>> + 'a + Send>>;

/// One-request/one-reply channel to the privileged side.
pub trait Bridge
where
	Self: Send + Sync,
{
	/// Sends `message` and resolves with the worker's reply.
	///
	/// A closed channel or a dropped reply is reported as [`TransportError::Relay`]; timeouts
	/// are enforced by the caller.
	fn send(&self, message: BridgeMessage) -> BridgeFuture<'_>;
}

/// Message plus the slot its reply is delivered to.
#[derive(Debug)]
pub struct BridgeEnvelope {
	/// Message sent by the sandboxed side.
	pub message: BridgeMessage,
	/// Reply slot.
	pub reply: oneshot::Sender<RelayReply>,
}

/// In-process [`Bridge`] over a tokio channel.
#[derive(Clone, Debug)]
pub struct ChannelBridge(mpsc::Sender<BridgeEnvelope>);
impl ChannelBridge {
	/// Creates a bridge and the receiver the worker drains.
	pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<BridgeEnvelope>) {
		let (tx, rx) = mpsc::channel(capacity.max(1));

		(Self(tx), rx)
	}
}
impl Bridge for ChannelBridge {
	fn send(&self, message: BridgeMessage) -> BridgeFuture<'_> {
		Box::pin(async move {
			let (reply, rx) = oneshot::channel();

			self.0
				.send(BridgeEnvelope { message, reply })
				.await
				.map_err(|_| TransportError::relay("background relay is not running"))?;

			rx.await.map_err(|_| TransportError::relay("background relay dropped the request"))
		})
	}
}

/// Counters reported by a [`BackgroundRelay`] when it stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelayStats {
	/// `PROXY_API_REQUEST` messages received.
	pub proxied: u64,
	/// `RELOAD_RESOURCES` messages received.
	pub reloads: u64,
}

const DEFAULT_CAPACITY: usize = 32;

/// Privileged worker that performs relayed API calls with a direct transport.
///
/// Each proxied request runs on its own task so slow calls do not block the queue. The worker
/// stops once every [`ChannelBridge`] clone is dropped.
pub struct BackgroundRelay {
	rx: mpsc::Receiver<BridgeEnvelope>,
	transport: Arc<dyn Transport>,
	timeouts: Timeouts,
}
impl BackgroundRelay {
	/// Creates a worker backed by `transport` and the bridge that feeds it.
	pub fn new(transport: Arc<dyn Transport>) -> (ChannelBridge, Self) {
		let (bridge, rx) = ChannelBridge::channel(DEFAULT_CAPACITY);

		(bridge, Self { rx, transport, timeouts: Timeouts::default() })
	}

	/// Overrides the timeouts applied to proxied calls.
	pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
		self.timeouts = timeouts;

		self
	}

	/// Runs the worker on the current runtime.
	pub fn spawn(self) -> JoinHandle<RelayStats> {
		tokio::spawn(self.run())
	}

	/// Serves messages until every bridge is dropped.
	pub async fn run(mut self) -> RelayStats {
		let mut stats = RelayStats::default();

		while let Some(BridgeEnvelope { message, reply }) = self.rx.recv().await {
			match message {
				BridgeMessage::ProxyApiRequest(request) => {
					stats.proxied += 1;

					let transport = self.transport.clone();
					let timeouts = self.timeouts;

					tokio::spawn(async move {
						let _ = reply.send(proxy(transport.as_ref(), timeouts, request).await);
					});
				},
				BridgeMessage::ReloadResources => {
					stats.reloads += 1;

					let _ = reply.send(RelayReply::ack());
				},
			}
		}

		stats
	}
}
impl Debug for BackgroundRelay {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BackgroundRelay").field("timeouts", &self.timeouts).finish_non_exhaustive()
	}
}

async fn proxy(transport: &dyn Transport, timeouts: Timeouts, request: RelayRequest) -> RelayReply {
	let url = match Url::parse(&request.url) {
		Ok(url) => url,
		Err(e) => return RelayReply::failure(format!("invalid URL `{}`: {e}", request.url)),
	};
	let force_refresh = url.query_pairs().any(|(k, v)| k == FORCE_REFRESH_PARAM && v == "true");
	let prepared = PreparedRequest {
		url,
		method: request.method,
		headers: request.headers,
		body: request.body,
		timeout: timeouts.request_for(force_refresh),
		force_refresh,
	};

	match transport.dispatch(prepared).await {
		Ok(response) => RelayReply::response(response),
		Err(e) => RelayReply::failure(e.to_string()),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::transport::TransportFuture;

	struct Echo;
	impl Transport for Echo {
		fn dispatch(&self, request: PreparedRequest) -> TransportFuture<'_> {
			Box::pin(async move {
				Ok(ApiResponse {
					status: 200,
					status_text: "OK".into(),
					data: json!({ "url": request.url.as_str(), "timeout": request.timeout.as_secs() }),
					..Default::default()
				})
			})
		}
	}

	#[test]
	fn messages_use_the_relay_wire_format() {
		let proxy = BridgeMessage::ProxyApiRequest(RelayRequest {
			url: "https://example.com/api/x/".into(),
			method: Method::Get,
			headers: BTreeMap::new(),
			body: None,
		});

		assert_eq!(
			serde_json::to_value(&proxy).expect("Message should serialize."),
			json!({
				"type": "PROXY_API_REQUEST",
				"data": { "url": "https://example.com/api/x/", "method": "GET", "headers": {}, "body": null }
			})
		);
		assert_eq!(
			serde_json::to_value(BridgeMessage::ReloadResources).expect("Message should serialize."),
			json!({ "type": "RELOAD_RESOURCES" })
		);
	}

	#[test]
	fn replies_parse_from_camel_case() {
		let reply: RelayReply = serde_json::from_value(json!({
			"success": true,
			"status": 404,
			"statusText": "Not Found",
			"headers": { "content-type": "application/json" },
			"data": { "detail": "missing" }
		}))
		.expect("Reply should parse.");
		let response = reply.into_response().expect("Successful reply should convert.");

		assert_eq!(response.status, 404);
		assert_eq!(response.status_text, "Not Found");

		let failed: RelayReply = serde_json::from_value(json!({ "success": false, "error": "offline" }))
			.expect("Failure reply should parse.");

		assert!(matches!(
			failed.into_response(),
			Err(TransportError::Relay { ref message }) if message == "offline"
		));
	}

	#[tokio::test]
	async fn worker_proxies_with_force_refresh_timeout() {
		let (bridge, relay) = BackgroundRelay::new(Arc::new(Echo));
		let worker = relay.spawn();
		let reply = bridge
			.send(BridgeMessage::ProxyApiRequest(RelayRequest {
				url: "https://example.com/api/x/?force_refresh=true".into(),
				method: Method::Get,
				headers: BTreeMap::new(),
				body: None,
			}))
			.await
			.expect("Relay should reply.");

		assert_eq!(reply.data["timeout"], json!(60));

		let ack = bridge.send(BridgeMessage::ReloadResources).await.expect("Relay should ack.");

		assert!(ack.success);

		drop(bridge);

		let stats = worker.await.expect("Relay worker should not panic.");

		assert_eq!(stats, RelayStats { proxied: 1, reloads: 1 });
	}

	#[tokio::test]
	async fn closed_bridge_is_a_relay_failure() {
		let (bridge, rx) = ChannelBridge::channel(1);

		drop(rx);

		let err = bridge.send(BridgeMessage::ReloadResources).await.expect_err("Send should fail.");

		assert!(matches!(err, TransportError::Relay { .. }));
	}
}
