#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use serde_json::Value;
use tokio::{sync::Semaphore, time::Instant};
// self
use cooltrade_api::{
	ApiClient, ClientConfig, Error,
	client::SessionObserver,
	error::TransportError,
	http::{ApiResponse, PreparedRequest},
	store::{LANGUAGE_KEY, MemoryStore, TOKEN_KEY},
	transport::{Transport, TransportFuture},
};

pub const TOKEN: &str = "3c40be432b414963c4a07d375ae4091f1756304d";

/// One scripted transport outcome.
#[derive(Clone, Debug)]
pub enum Step {
	Reply(u16, Value),
	NetworkDown,
}
impl Step {
	fn into_result(self) -> Result<ApiResponse, Error> {
		match self {
			Step::Reply(status, data) => Ok(ApiResponse { status, data, ..Default::default() }),
			Step::NetworkDown => Err(TransportError::network(std::io::Error::other(
				"connection refused",
			))
			.into()),
		}
	}
}

/// Replays `steps` in order, repeating the last one once the script runs out.
///
/// When gated, each dispatch waits for a permit before replying.
pub struct Scripted {
	steps: Mutex<VecDeque<Step>>,
	sent: Mutex<Vec<(Instant, PreparedRequest)>>,
	gate: Option<Arc<Semaphore>>,
}
impl Scripted {
	pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
		Arc::new(Self { steps: Mutex::new(steps.into_iter().collect()), sent: Default::default(), gate: None })
	}

	pub fn gated(steps: impl IntoIterator<Item = Step>, gate: Arc<Semaphore>) -> Arc<Self> {
		Arc::new(Self {
			steps: Mutex::new(steps.into_iter().collect()),
			sent: Default::default(),
			gate: Some(gate),
		})
	}

	pub fn sent(&self) -> Vec<PreparedRequest> {
		self.sent.lock().expect("Sent log should not be poisoned.").iter().map(|(_, r)| r.clone()).collect()
	}

	pub fn sent_count(&self) -> usize {
		self.sent.lock().expect("Sent log should not be poisoned.").len()
	}

	/// Offsets of every dispatch relative to the first one, in whole seconds.
	pub fn offsets_secs(&self) -> Vec<u64> {
		let sent = self.sent.lock().expect("Sent log should not be poisoned.");
		let Some((first, _)) = sent.first() else {
			return Vec::new();
		};

		sent.iter().map(|(at, _)| (*at - *first).as_secs()).collect()
	}

	fn next_step(&self) -> Step {
		let mut steps = self.steps.lock().expect("Script should not be poisoned.");

		if steps.len() > 1 {
			steps.pop_front().expect("Script should not be empty.")
		} else {
			steps.front().cloned().expect("Script should not be empty.")
		}
	}
}
impl Transport for Scripted {
	fn dispatch(&self, request: PreparedRequest) -> TransportFuture<'_> {
		self.sent.lock().expect("Sent log should not be poisoned.").push((Instant::now(), request));

		let step = self.next_step();
		let gate = self.gate.clone();

		Box::pin(async move {
			if let Some(gate) = gate {
				gate.acquire().await.expect("Gate should stay open.").forget();
			}

			step.into_result()
		})
	}
}

/// Counts re-authentication notifications.
#[derive(Default)]
pub struct CountingObserver(AtomicUsize);
impl CountingObserver {
	pub fn count(&self) -> usize {
		self.0.load(Ordering::SeqCst)
	}
}
impl SessionObserver for CountingObserver {
	fn reauth_required(&self, _: &str) {
		self.0.fetch_add(1, Ordering::SeqCst);
	}
}

pub fn authed_store() -> MemoryStore {
	MemoryStore::with_entries([(TOKEN_KEY, format!("Token {TOKEN}"))])
}

pub fn authed_store_with_language(language: &str) -> MemoryStore {
	MemoryStore::with_entries([
		(TOKEN_KEY.to_owned(), format!("Token {TOKEN}")),
		(LANGUAGE_KEY.to_owned(), language.to_owned()),
	])
}

pub fn build_client(
	config: ClientConfig,
	store: &MemoryStore,
	transport: Arc<dyn Transport>,
) -> ApiClient {
	ApiClient::with_transport(config, Arc::new(store.clone()), transport)
		.expect("Client should build from a valid configuration.")
}

pub fn nested_report() -> Value {
	serde_json::json!({
		"current_price": 64000.5,
		"trend_analysis": {
			"probabilities": { "up": 0.6, "sideways": 0.3, "down": 0.1 },
			"summary": "Bullish continuation"
		},
		"indicators_analysis": { "RSI": { "value": 61.2, "analysis": "neutral", "support_trend": "up" } },
		"trading_advice": {
			"action": "buy",
			"reason": "Momentum",
			"entry_price": 63900,
			"stop_loss": 62000,
			"take_profit": 68000
		},
		"risk_assessment": { "level": "low", "score": 30, "details": ["thin liquidity"] },
		"last_update_time": "2025-01-01T00:00:00Z"
	})
}
