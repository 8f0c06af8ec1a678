#![cfg(feature = "reqwest")]

mod common;

// std
use std::{sync::Arc, time::Duration};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use cooltrade_api::{
	ApiClient, ClientConfig, Error,
	config::Timeouts,
	error::TransportError,
	http::ApiRequest,
	limiter::RateLimitPolicy,
	retry::RetryPolicy,
	store::MemoryStore,
};

fn fast_config(base_url: String) -> ClientConfig {
	ClientConfig::default()
		.with_base_url(base_url)
		.with_retry(RetryPolicy {
			max_retries: 1,
			base_delay: Duration::from_millis(10),
			..RetryPolicy::default()
		})
		.with_rate_limit(RateLimitPolicy { min_interval: Duration::ZERO, ..RateLimitPolicy::default() })
}

fn build_client(config: ClientConfig, store: &MemoryStore) -> ApiClient {
	ApiClient::new(config, Arc::new(store.clone())).expect("Client should build.")
}

#[tokio::test]
async fn report_request_carries_credential_and_cache_headers() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/crypto/technical-indicators/BTCUSDT/")
				.query_param("language", "en-US")
				.header("Authorization", format!("Token {}", common::TOKEN))
				.header("Cache-Control", "no-cache");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "status": "success", "data": common::nested_report() }));
		})
		.await;
	let store = common::authed_store_with_language("en-US");
	let client = build_client(fast_config(server.url("/api/")), &store);
	let report = client
		.technical_indicators("btc", false)
		.await
		.expect("Indicators should load.")
		.ready()
		.expect("Report should be ready.");

	assert_eq!(report.current_price, 64000.5);
	assert_eq!(report.risk.level, "low");
	assert!(!report.fallback);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn persistent_server_error_exhausts_the_budget() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/crypto/technical-indicators/ETHUSDT/");
			then.status(503).json_body(json!({ "detail": "Service unavailable" }));
		})
		.await;
	let store = common::authed_store();
	let client = build_client(fast_config(server.url("/api/")), &store);
	let err = client
		.technical_indicators("ETH", false)
		.await
		.expect_err("Persistent 503 should fail.");

	match err {
		Error::RetriesExhausted { attempts: 2, last } => assert!(matches!(
			*last,
			Error::Server { status: 503, ref message } if message == "Service unavailable"
		)),
		other => panic!("Unexpected error: {other:?}."),
	}

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn non_json_success_body_is_malformed() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/crypto/technical-indicators/BTCUSDT/");
			then.status(200).header("content-type", "text/html").body("<html>maintenance</html>");
		})
		.await;
	let store = common::authed_store();
	let client = build_client(fast_config(server.url("/api/")), &store);
	let err = client.technical_indicators("BTC", false).await.expect_err("HTML should fail.");

	assert!(matches!(err, Error::MalformedResponse { .. }));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn login_stores_repaired_credential_and_profile() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/auth/login/")
				.header("Content-Type", "application/json")
				.json_body(json!({ "email": "trader@example.com", "password": "hunter22" }));
			then.status(200).json_body(json!({
				"status": "success",
				"data": {
					"token": common::TOKEN,
					"user": { "id": 7, "email": "trader@example.com", "username": "trader" }
				}
			}));
		})
		.await;
	let store = MemoryStore::default();
	let client = build_client(fast_config(server.url("/api/")), &store);
	let login = client.login(" trader@example.com ", "hunter22").await.expect("Login should succeed.");

	assert_eq!(login.user.id, 7);
	assert_eq!(
		store.peek(cooltrade_api::store::TOKEN_KEY).as_deref(),
		Some(format!("Token {}", common::TOKEN).as_str())
	);
	assert!(store.peek(cooltrade_api::store::USER_INFO_KEY).is_some());

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn refused_connection_is_a_transport_failure() {
	let store = common::authed_store();
	let config = fast_config("http://127.0.0.1:9/api/".into())
		.with_retry(RetryPolicy { max_retries: 0, ..RetryPolicy::default() });
	let client = build_client(config, &store);
	let err = client
		.execute(ApiRequest::get("/crypto/technical-indicators/BTCUSDT/"))
		.await
		.expect_err("Nothing listens on the discard port.");

	match err {
		Error::RetriesExhausted { attempts: 1, last } => {
			assert!(matches!(*last, Error::Transport(TransportError::Network { .. })))
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn slow_response_times_out() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/crypto/technical-indicators/BTCUSDT/");
			then.status(200).delay(Duration::from_secs(2)).json_body(json!({ "ok": true }));
		})
		.await;
	let store = common::authed_store();
	let config = fast_config(server.url("/api/"))
		.with_retry(RetryPolicy { max_retries: 0, ..RetryPolicy::default() })
		.with_timeouts(Timeouts { request: Duration::from_millis(200), ..Timeouts::default() });
	let client = build_client(config, &store);
	let err = client
		.execute(ApiRequest::get("/crypto/technical-indicators/BTCUSDT/"))
		.await
		.expect_err("Slow response should time out.");

	match err {
		Error::RetriesExhausted { last, .. } => assert!(matches!(
			*last,
			Error::Transport(TransportError::Timeout { after }) if after == Duration::from_millis(200)
		)),
		other => panic!("Unexpected error: {other:?}."),
	}
}
