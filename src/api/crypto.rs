//! Report endpoints.

// self
use crate::{
	_prelude::*,
	ApiClient,
	api::Language,
	http::{ApiRequest, CACHE_BUST_PARAM, LANGUAGE_PARAM},
	obs::CallKind,
	report::ReportOutcome,
};

const QUOTE_ASSET: &str = "USDT";

/// Normalizes a trading symbol: trimmed, uppercased, `USDT` appended when missing.
pub fn normalize_symbol(symbol: &str) -> Result<String> {
	let upper = symbol.trim().to_uppercase();

	if upper.is_empty() || upper == QUOTE_ASSET {
		return Err(Error::InvalidSymbol { symbol: symbol.to_owned() });
	}
	if upper.ends_with(QUOTE_ASSET) {
		return Ok(upper);
	}

	Ok(format!("{upper}{QUOTE_ASSET}"))
}

impl ApiClient {
	/// Language the report endpoints are queried with.
	pub async fn current_language(&self) -> Result<Language> {
		Language::resolve(self.store().as_ref(), self.config().default_language).await
	}

	/// Fetches the technical-indicator snapshot for `symbol`.
	///
	/// `force_refresh` asks the server to recompute the analysis, which selects the longer
	/// timeout and the doubled retry budget.
	pub async fn technical_indicators(&self, symbol: &str, force_refresh: bool) -> Result<ReportOutcome> {
		let symbol = normalize_symbol(symbol)?;
		let language = self.current_language().await?;
		let mut request = ApiRequest::get(format!("/crypto/technical-indicators/{symbol}/"))
			.with_query(LANGUAGE_PARAM, language.as_str());

		if force_refresh {
			request = request.force_refresh();
		}

		let envelope = self
			.call(CallKind::Indicators, "technical_indicators", &request, &CancellationToken::new())
			.await?
			.into_result()?;

		ReportOutcome::from_payload(envelope.data)
	}

	/// Fetches the latest report for `symbol`.
	///
	/// A second call for the same symbol and language while one is pending fails immediately
	/// with [`Error::DuplicateInFlight`].
	pub async fn latest_report(&self, symbol: &str) -> Result<ReportOutcome> {
		self.latest_report_with_cancel(symbol, &CancellationToken::new()).await
	}

	/// Like [`latest_report`](Self::latest_report), failing with [`Error::Cancelled`] once
	/// `cancel` fires.
	pub async fn latest_report_with_cancel(
		&self,
		symbol: &str,
		cancel: &CancellationToken,
	) -> Result<ReportOutcome> {
		let symbol = normalize_symbol(symbol)?;
		let language = self.current_language().await?;
		let request = ApiRequest::get(format!("/crypto/get_report/{symbol}/"))
			.with_query(LANGUAGE_PARAM, language.as_str())
			.with_query(CACHE_BUST_PARAM, cache_buster());
		let envelope = self
			.call_deduplicated(CallKind::Report, "latest_report", &request, cancel)
			.await?
			.into_result()?;

		ReportOutcome::from_payload(envelope.data)
	}
}

fn cache_buster() -> String {
	(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).to_string()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn symbols_are_normalized() {
		assert_eq!(normalize_symbol(" btc ").expect("Symbol should normalize."), "BTCUSDT");
		assert_eq!(normalize_symbol("ethusdt").expect("Symbol should normalize."), "ETHUSDT");
		assert!(matches!(normalize_symbol("  "), Err(Error::InvalidSymbol { .. })));
		assert!(matches!(normalize_symbol("usdt"), Err(Error::InvalidSymbol { .. })));
	}

	#[test]
	fn cache_buster_is_millisecond_timestamp() {
		let value = cache_buster().parse::<i128>().expect("Cache buster should be numeric.");

		assert!(value > 1_600_000_000_000);
	}
}
