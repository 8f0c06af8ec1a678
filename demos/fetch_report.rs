//! Logs in against a mock CoolTrade server, then fetches a technical-indicator report through the
//! default reqwest transport, falling back to neutral values when the server keeps failing.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use cooltrade_api::{
	ApiClient, ClientConfig,
	report::{self, ReportOutcome},
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login/");
			then.status(200).json_body(json!({
				"status": "success",
				"data": {
					"token": "3c40be432b414963c4a07d375ae4091f1756304d",
					"user": { "id": 1, "email": "demo@cooltrade.xyz", "username": "demo" }
				}
			}));
		})
		.await;
	let report_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/crypto/technical-indicators/BTCUSDT/");
			then.status(200).json_body(json!({
				"status": "success",
				"data": {
					"current_price": 64000.5,
					"trend_up_probability": 0.55,
					"trend_sideways_probability": 0.3,
					"trend_down_probability": 0.15,
					"trend_summary": "Higher lows on the daily chart",
					"indicators_analysis": {},
					"trading_action": "buy",
					"trading_reason": "Momentum is building",
					"entry_price": 63800,
					"stop_loss": 62000,
					"take_profit": 68000,
					"risk_level": "medium",
					"risk_score": 45,
					"risk_details": [],
					"last_update_time": "2025-01-01T00:00:00Z"
				}
			}));
		})
		.await;
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let client = ApiClient::new(ClientConfig::default().with_base_url(server.url("/api/")), store)?;
	let login = client.login("demo@cooltrade.xyz", "demo-password").await?;

	println!("Logged in as {}.", login.user.username);

	let outcome = client.technical_indicators("btc", false).await;
	let analysis = match outcome {
		Ok(ReportOutcome::NotFound { message, .. }) => {
			println!("No report yet: {}.", message.unwrap_or_default());

			return Ok(());
		},
		Ok(ReportOutcome::Ready(analysis)) => Ok(*analysis),
		Err(e) => Err(e),
	};
	let analysis = report::display_or_fallback(analysis)?;

	println!(
		"BTCUSDT at {} - {} (up {:.0}%, risk {}).",
		analysis.current_price,
		analysis.trading_advice.action,
		analysis.trend.up * 100.,
		analysis.risk.level
	);

	login_mock.assert_async().await;
	report_mock.assert_async().await;

	Ok(())
}
