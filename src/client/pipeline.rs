//! Per-call pipeline: token guard → rate limiter → transport → classification, wrapped in a
//! bounded retry loop.

// self
use crate::{
	_prelude::*,
	ApiClient,
	auth::{self, Credential},
	clock,
	http::{ApiRequest, ApiResponse, Envelope, PreparedRequest},
	obs::{self, CallKind, CallOutcome, CallSpan},
};

impl ApiClient {
	/// Runs `request` through the full pipeline and returns the normalized envelope.
	pub async fn execute(&self, request: ApiRequest) -> Result<Envelope> {
		self.execute_with_cancel(request, &CancellationToken::new()).await
	}

	/// Like [`execute`](Self::execute), failing with [`Error::Cancelled`] once `cancel` fires.
	///
	/// Cancellation interrupts the rate-limit wait, the dispatch, and the backoff sleep.
	pub async fn execute_with_cancel(
		&self,
		request: ApiRequest,
		cancel: &CancellationToken,
	) -> Result<Envelope> {
		self.call(CallKind::Other, "execute", &request, cancel).await
	}

	/// Like [`execute_with_cancel`](Self::execute_with_cancel), rejecting the call with
	/// [`Error::DuplicateInFlight`] while the same logical request is pending.
	pub async fn execute_deduplicated(
		&self,
		request: ApiRequest,
		cancel: &CancellationToken,
	) -> Result<Envelope> {
		self.call_deduplicated(CallKind::Other, "execute_deduplicated", &request, cancel).await
	}

	pub(crate) async fn call_deduplicated(
		&self,
		kind: CallKind,
		stage: &'static str,
		request: &ApiRequest,
		cancel: &CancellationToken,
	) -> Result<Envelope> {
		let _in_flight = self.in_flight.begin(request.identity())?;

		self.call(kind, stage, request, cancel).await
	}

	pub(crate) async fn call(
		&self,
		kind: CallKind,
		stage: &'static str,
		request: &ApiRequest,
		cancel: &CancellationToken,
	) -> Result<Envelope> {
		let span = CallSpan::new(kind, stage);
		let result = span.instrument(self.run(kind, request, cancel)).await;

		match &result {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_call_outcome(kind, CallOutcome::Success);
			},
			Err(_) => {
				self.metrics.record_failure();
				obs::record_call_outcome(kind, CallOutcome::Failure);
			},
		}

		result
	}

	async fn run(
		&self,
		kind: CallKind,
		request: &ApiRequest,
		cancel: &CancellationToken,
	) -> Result<Envelope> {
		let force_refresh = request.is_force_refresh();
		let max_retries = self.config.retry.max_retries_for(force_refresh);
		let url = self.config.endpoint_url(&request.path, &request.query)?;
		let mut reloaded = false;
		let mut retry = 0;

		loop {
			let err = match self.attempt(kind, request, &url, force_refresh, cancel).await {
				Ok(envelope) => return Ok(envelope),
				Err(e) => e,
			};

			if let Error::AuthInvalid { reason } = &err {
				self.end_session(reason).await;

				return Err(err);
			}
			if !err.is_retryable() {
				return Err(err);
			}
			if retry >= max_retries {
				return Err(Error::RetriesExhausted { attempts: retry + 1, last: Box::new(err) });
			}
			if err.is_extension_resource_miss() && !reloaded {
				reloaded = true;

				// The retry still runs if the reload request itself fails.
				let _ = self.transport.reload_resources().await;
			}

			let delay = self.config.retry.delay_for(retry);

			obs::retry_scheduled(retry + 1, delay, &err);
			obs::record_call_outcome(kind, CallOutcome::Retry);
			self.metrics.record_retry();
			clock::sleep_or_cancel(self.clock.as_ref(), delay, cancel).await?;

			retry += 1;
		}
	}

	async fn attempt(
		&self,
		kind: CallKind,
		request: &ApiRequest,
		url: &Url,
		force_refresh: bool,
		cancel: &CancellationToken,
	) -> Result<Envelope> {
		let credential = if auth::is_auth_endpoint(&request.path) {
			None
		} else {
			Some(self.guard.require().await?)
		};
		let waited = self.limiter.admit(self.clock.as_ref(), cancel).await?;

		if !waited.is_zero() {
			self.metrics.record_throttled();
		}

		let prepared = self.prepare(request, url.clone(), credential.as_ref(), force_refresh);

		self.metrics.record_dispatch();
		obs::record_call_outcome(kind, CallOutcome::Attempt);

		let response = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(Error::Cancelled),
			response = self.transport.dispatch(prepared) => response?,
		};

		self.classify(url, response)
	}

	fn prepare(
		&self,
		request: &ApiRequest,
		url: Url,
		credential: Option<&Credential>,
		force_refresh: bool,
	) -> PreparedRequest {
		let mut headers = request.headers.clone();

		headers.insert("Content-Type".into(), "application/json".into());
		headers.insert("Cache-Control".into(), "no-cache".into());
		headers.insert("Pragma".into(), "no-cache".into());

		if let Some(credential) = credential {
			headers.insert("Authorization".into(), credential.header_value());
		}

		PreparedRequest {
			url,
			method: request.method,
			headers,
			body: request.body.clone(),
			timeout: self.config.timeouts.request_for(force_refresh),
			force_refresh,
		}
	}

	fn classify(&self, url: &Url, response: ApiResponse) -> Result<Envelope> {
		if response.is_success() {
			return Envelope::from_body(response.data);
		}

		let message = response.error_message();

		Err(match response.status {
			401 => Error::AuthInvalid { reason: message },
			404 => Error::NotFound {
				url: url.to_string(),
				extension_resource: self.config.is_extension_resource(url),
			},
			status @ 500..=599 => Error::Server { status, message },
			status => Error::Http { status, message },
		})
	}

	async fn end_session(&self, reason: &str) {
		// The caller gets the authentication error even if the store cannot be cleared.
		let _ = self.guard.clear().await;

		obs::session_cleared(reason);
		self.observer.reauth_required(reason);
	}
}
