//! Direct HTTP transport backed by reqwest.

// crates.io
use reqwest::Method as ReqwestMethod;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	http::{ApiResponse, Method, PreparedRequest},
	transport::{Transport, TransportFuture},
};

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The per-request timeout comes from [`PreparedRequest::timeout`]; a custom client only needs
/// its own connection settings.
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
impl ReqwestTransport {
	/// Builds a transport with a default reqwest client.
	pub fn new() -> Result<Self, ConfigError> {
		Ok(Self(ReqwestClient::builder().build()?))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Transport for ReqwestTransport {
	fn dispatch(&self, request: PreparedRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let timeout = request.timeout;
			let map_err = |e: ReqwestError| {
				if e.is_timeout() {
					TransportError::Timeout { after: timeout }
				} else {
					TransportError::network(e)
				}
			};
			let mut builder = self.0.request(method(request.method), request.url).timeout(timeout);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = &request.body {
				builder = builder.body(serde_json::to_vec(body).map_err(TransportError::network)?);
			}

			let response = builder.send().await.map_err(map_err)?;
			let status = response.status();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let bytes = response.bytes().await.map_err(map_err)?;

			Ok(ApiResponse {
				status: status.as_u16(),
				status_text: status.canonical_reason().unwrap_or_default().to_owned(),
				headers,
				data: ApiResponse::decode_body(&bytes),
			})
		})
	}
}

fn method(method: Method) -> ReqwestMethod {
	match method {
		Method::Get => ReqwestMethod::GET,
		Method::Post => ReqwestMethod::POST,
		Method::Put => ReqwestMethod::PUT,
		Method::Delete => ReqwestMethod::DELETE,
	}
}
