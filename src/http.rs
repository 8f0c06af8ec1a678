//! Request and response model shared by the pipeline and its transports.
//!
//! [`ApiRequest`] is what callers describe (relative path, query, body). The pipeline resolves
//! it into a [`PreparedRequest`] carrying the absolute URL, final headers, and timeout, and a
//! transport turns that into an [`ApiResponse`]. Successful bodies are normalized into an
//! [`Envelope`].

// self
use crate::{_prelude::*, dedup::RequestIdentity};

/// Query parameter that selects the force-refresh budget and timeout.
pub const FORCE_REFRESH_PARAM: &str = "force_refresh";
/// Cache-busting query parameter excluded from request identity.
pub const CACHE_BUST_PARAM: &str = "_t";
/// Query parameter that contributes to request identity.
pub const LANGUAGE_PARAM: &str = "language";

/// HTTP method supported by the API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	#[default]
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Uppercase method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Caller-facing description of one logical API call.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the configured base URL, or an absolute URL.
	pub path: String,
	/// Query parameters in insertion order.
	pub query: Vec<(String, String)>,
	/// Extra headers; pipeline headers overwrite entries with the same name.
	pub headers: BTreeMap<String, String>,
	/// JSON body.
	pub body: Option<Value>,
}
impl ApiRequest {
	/// Creates a request with no query, headers, or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: BTreeMap::new(),
			body: None,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request with a JSON body.
	pub fn post(path: impl Into<String>, body: Value) -> Self {
		Self::new(Method::Post, path).with_body(body)
	}

	/// Appends a query parameter.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Sets a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Replaces the body.
	pub fn with_body(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Adds `force_refresh=true`.
	pub fn force_refresh(self) -> Self {
		self.with_query(FORCE_REFRESH_PARAM, "true")
	}

	/// Returns `true` when the query carries `force_refresh=true`.
	pub fn is_force_refresh(&self) -> bool {
		self.query_value(FORCE_REFRESH_PARAM).is_some_and(|v| v.eq_ignore_ascii_case("true"))
	}

	/// First value of query parameter `key`.
	pub fn query_value(&self, key: &str) -> Option<&str> {
		self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}

	/// Logical identity: path plus language, ignoring cache-busting parameters.
	pub fn identity(&self) -> RequestIdentity {
		RequestIdentity::new(
			&self.path,
			self.query_value(LANGUAGE_PARAM).map(|language| (LANGUAGE_PARAM, language)),
		)
	}
}

/// Fully resolved request handed to a transport.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedRequest {
	/// Absolute URL including the query string.
	pub url: Url,
	/// HTTP method.
	pub method: Method,
	/// Final header set.
	pub headers: BTreeMap<String, String>,
	/// JSON body.
	pub body: Option<Value>,
	/// Transport timeout for this attempt.
	pub timeout: Duration,
	/// Whether the request carries `force_refresh=true`.
	pub force_refresh: bool,
}

/// Transport-neutral response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Reason phrase, when known.
	#[serde(default)]
	pub status_text: String,
	/// Response headers (lowercase names).
	#[serde(default)]
	pub headers: BTreeMap<String, String>,
	/// Decoded body; non-JSON bodies arrive as a string and empty bodies as `null`.
	#[serde(default)]
	pub data: Value,
}
impl ApiResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Best-effort message for error reporting: `message`/`detail`/`error` fields, a string
	/// body, or the status text.
	pub fn error_message(&self) -> String {
		let from_body = match &self.data {
			Value::Object(map) => ["message", "detail", "error"]
				.iter()
				.find_map(|key| map.get(*key).and_then(Value::as_str))
				.map(str::to_owned),
			Value::String(s) if !s.is_empty() => Some(s.clone()),
			_ => None,
		};

		from_body.unwrap_or_else(|| {
			if self.status_text.is_empty() {
				format!("HTTP {}", self.status)
			} else {
				self.status_text.clone()
			}
		})
	}

	/// Decodes a raw body: empty → `null`, JSON → value, anything else → string.
	pub fn decode_body(bytes: &[u8]) -> Value {
		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Value::Null;
		}

		serde_json::from_slice(bytes)
			.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
	}
}

/// Envelope status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
	/// `"success"`
	Success,
	/// `"error"`
	Error,
}

/// Normalized response body `{status, data, message?}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
	/// Outcome reported by the server.
	pub status: EnvelopeStatus,
	/// Payload.
	#[serde(default)]
	pub data: Value,
	/// Optional human-readable message.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}
impl Envelope {
	/// Normalizes a 2xx body.
	///
	/// Objects already shaped as an envelope pass through; any other object is wrapped as
	/// `{status: "success", data: <object>}`; non-objects are rejected.
	pub fn from_body(body: Value) -> Result<Self> {
		let Value::Object(map) = body else {
			return Err(Error::MalformedResponse {
				reason: format!("expected a JSON object, got {}", json_kind(&body)),
			});
		};
		let status = match map.get("status").and_then(Value::as_str) {
			Some("success") => Some(EnvelopeStatus::Success),
			Some("error") => Some(EnvelopeStatus::Error),
			_ => None,
		};

		match status {
			Some(status) => {
				let message = map.get("message").and_then(Value::as_str).map(str::to_owned);
				let data = map.get("data").cloned().unwrap_or(Value::Null);

				Ok(Self { status, data, message })
			},
			None => Ok(Self { status: EnvelopeStatus::Success, data: Value::Object(map), message: None }),
		}
	}

	/// Returns `true` for `status: "success"`.
	pub fn is_success(&self) -> bool {
		self.status == EnvelopeStatus::Success
	}

	/// Converts an error envelope into [`Error::Rejected`].
	pub fn into_result(self) -> Result<Self> {
		match self.status {
			EnvelopeStatus::Success => Ok(self),
			EnvelopeStatus::Error => Err(Error::Rejected {
				message: self.message.unwrap_or_else(|| "request was rejected".into()),
			}),
		}
	}
}

fn json_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}
