mod common;

// std
use std::{sync::Arc, time::Duration};
// crates.io
use serde_json::json;
use tokio::time::Instant;
// self
use common::{CountingObserver, Scripted, Step};
use cooltrade_api::{
	CancellationToken, ClientConfig, Error,
	error::TransportError,
	http::ApiRequest,
	store::{MemoryStore, TOKEN_KEY, USER_INFO_KEY},
};

const INDICATORS: &str = "/crypto/technical-indicators/BTCUSDT/";

#[tokio::test(start_paused = true)]
async fn always_failing_transport_retries_three_times_with_doubling_delays() {
	let store = common::authed_store();
	let transport = Scripted::new([Step::NetworkDown]);
	let client = common::build_client(ClientConfig::default(), &store, transport.clone());
	let start = Instant::now();
	let err = client
		.execute(ApiRequest::get(INDICATORS))
		.await
		.expect_err("Persistent network failure should exhaust retries.");

	match err {
		Error::RetriesExhausted { attempts, last } => {
			assert_eq!(attempts, 4);
			assert!(matches!(*last, Error::Transport(TransportError::Network { .. })));
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	assert_eq!(transport.offsets_secs(), vec![0, 2, 6, 14]);
	assert_eq!(start.elapsed(), Duration::from_secs(14));
	assert_eq!(client.metrics().retries(), 3);
	assert_eq!(client.metrics().dispatches(), 4);
	assert_eq!(client.metrics().failures(), 1);
}

#[tokio::test(start_paused = true)]
async fn force_refresh_doubles_the_retry_budget() {
	let store = common::authed_store();
	let transport = Scripted::new([Step::Reply(503, json!({ "detail": "warming up" }))]);
	let client = common::build_client(ClientConfig::default(), &store, transport.clone());
	let err = client
		.execute(ApiRequest::get(INDICATORS).force_refresh())
		.await
		.expect_err("Persistent 503 should exhaust retries.");

	assert!(matches!(err, Error::RetriesExhausted { attempts: 7, .. }));
	assert_eq!(transport.offsets_secs(), vec![0, 2, 6, 14, 30, 62, 126]);
	assert!(transport.sent().iter().all(|r| r.timeout == Duration::from_secs(60)));
}

#[tokio::test(start_paused = true)]
async fn server_error_then_success_recovers() {
	let store = common::authed_store();
	let transport = Scripted::new([
		Step::Reply(500, json!({ "message": "boom" })),
		Step::Reply(200, json!({ "status": "success", "data": { "price": 1 } })),
	]);
	let client = common::build_client(ClientConfig::default(), &store, transport.clone());
	let envelope = client.execute(ApiRequest::get(INDICATORS)).await.expect("Retry should recover.");

	assert_eq!(envelope.data, json!({ "price": 1 }));
	assert_eq!(transport.sent_count(), 2);
	assert_eq!(client.metrics().retries(), 1);
	assert_eq!(client.metrics().successes(), 1);
}

#[tokio::test(start_paused = true)]
async fn unauthorized_clears_session_and_notifies_observer() {
	let store = MemoryStore::with_entries([
		(TOKEN_KEY.to_owned(), format!("Token {}", common::TOKEN)),
		(USER_INFO_KEY.to_owned(), "{\"id\":1}".to_owned()),
	]);
	let observer = Arc::new(CountingObserver::default());
	let transport = Scripted::new([Step::Reply(401, json!({ "detail": "Invalid token." }))]);
	let client = common::build_client(ClientConfig::default(), &store, transport.clone())
		.with_observer(observer.clone());
	let err = client.execute(ApiRequest::get(INDICATORS)).await.expect_err("401 should fail.");

	assert!(matches!(err, Error::AuthInvalid { ref reason } if reason == "Invalid token."));
	assert_eq!(transport.sent_count(), 1);
	assert_eq!(observer.count(), 1);
	assert!(store.peek(TOKEN_KEY).is_none());
	assert!(store.peek(USER_INFO_KEY).is_none());

	let err = client.execute(ApiRequest::get(INDICATORS)).await.expect_err("Cleared session should fail.");

	assert!(err.requires_reauth());
	assert_eq!(transport.sent_count(), 1);
	assert_eq!(observer.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn terminal_failures_are_not_retried() {
	let cases: [(Step, fn(&Error) -> bool); 3] = [
		(Step::Reply(404, json!({ "detail": "Not found." })), |e| {
			matches!(e, Error::NotFound { extension_resource: false, .. })
		}),
		(Step::Reply(400, json!({ "message": "bad symbol" })), |e| {
			matches!(e, Error::Http { status: 400, .. })
		}),
		(Step::Reply(200, json!("<html>")), |e| matches!(e, Error::MalformedResponse { .. })),
	];

	for (step, check) in cases {
		let store = common::authed_store();
		let transport = Scripted::new([step]);
		let client = common::build_client(ClientConfig::default(), &store, transport.clone());
		let err = client.execute(ApiRequest::get(INDICATORS)).await.expect_err("Call should fail.");

		assert!(check(&err), "Unexpected error: {err:?}.");
		assert_eq!(transport.sent_count(), 1);
	}
}

#[tokio::test(start_paused = true)]
async fn stored_token_without_prefix_is_repaired_before_dispatch() {
	let store = MemoryStore::with_entries([(TOKEN_KEY, "abc123")]);
	let transport = Scripted::new([Step::Reply(200, json!({ "ok": true }))]);
	let client = common::build_client(ClientConfig::default(), &store, transport.clone());

	client.execute(ApiRequest::get(INDICATORS)).await.expect("Call should succeed.");

	assert_eq!(store.peek(TOKEN_KEY).as_deref(), Some("Token abc123"));
	assert_eq!(transport.sent()[0].headers["Authorization"], "Token abc123");
}

#[tokio::test(start_paused = true)]
async fn consecutive_calls_are_spaced_by_the_minimum_gap() {
	let store = common::authed_store();
	let transport = Scripted::new([Step::Reply(200, json!({ "ok": true }))]);
	let client = common::build_client(ClientConfig::default(), &store, transport.clone());

	for _ in 0..3 {
		client.execute(ApiRequest::get(INDICATORS)).await.expect("Call should succeed.");
	}

	assert_eq!(transport.offsets_secs(), vec![0, 2, 4]);
	assert_eq!(client.metrics().throttled(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_backoff() {
	let store = common::authed_store();
	let transport = Scripted::new([Step::NetworkDown]);
	let client = common::build_client(ClientConfig::default(), &store, transport.clone());
	let cancel = CancellationToken::new();
	let task = {
		let client = client.clone();
		let cancel = cancel.clone();

		tokio::spawn(async move {
			client.execute_with_cancel(ApiRequest::get(INDICATORS), &cancel).await
		})
	};
	let start = Instant::now();

	tokio::time::sleep(Duration::from_secs(1)).await;
	cancel.cancel();

	let err = task.await.expect("Task should not panic.").expect_err("Cancelled call should fail.");

	assert!(matches!(err, Error::Cancelled));
	assert_eq!(transport.sent_count(), 1);
	assert!(start.elapsed() < Duration::from_secs(2));
}
