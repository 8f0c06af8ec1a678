//! Technical-analysis report model and the normalizer for the two payload shapes the report
//! endpoints return.
//!
//! Regular reports nest their sections (`trend_analysis`, `indicators_analysis`,
//! `trading_advice`, `risk_assessment`). Freshly recomputed reports come back flat
//! (`trend_up_probability`, `trading_action`, `risk_level`, ...). Both normalize into
//! [`TechnicalAnalysis`] with a default for every missing or mistyped field.

// crates.io
use serde_json::Map;
use time::format_description::well_known::Rfc3339;
// self
use crate::_prelude::*;

const NO_DATA: &str = "No data";
const NO_ADVICE: &str = "No advice";
const DEFAULT_RISK_LEVEL: &str = "medium";
const DEFAULT_RISK_SCORE: f64 = 50.;

/// Trend probabilities plus a narrative summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
	/// Probability of an upward move.
	pub up: f64,
	/// Probability of a sideways move.
	pub sideways: f64,
	/// Probability of a downward move.
	pub down: f64,
	/// Narrative summary.
	pub summary: String,
}

/// Suggested trade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradingAdvice {
	/// Suggested action (buy, sell, hold, ...).
	pub action: String,
	/// Rationale.
	pub reason: String,
	/// Entry price.
	pub entry_price: f64,
	/// Stop-loss price.
	pub stop_loss: f64,
	/// Take-profit price.
	pub take_profit: f64,
}

/// Risk summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
	/// Risk level label.
	pub level: String,
	/// Score on a 0-100 scale.
	pub score: f64,
	/// Individual risk notes.
	pub details: Vec<String>,
}

/// Normalized technical-analysis report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
	/// Latest price.
	pub current_price: f64,
	/// Trend probabilities.
	pub trend: TrendAnalysis,
	/// Per-indicator analysis, passed through untouched.
	pub indicators: Map<String, Value>,
	/// Trading advice.
	pub trading_advice: TradingAdvice,
	/// Risk assessment.
	pub risk: RiskAssessment,
	/// Server timestamp (RFC 3339), or the normalization time when absent.
	pub last_update_time: String,
	/// `true` when this is a placeholder produced after a failed load.
	#[serde(default)]
	pub fallback: bool,
}
impl TechnicalAnalysis {
	/// Normalizes a report payload, unwrapping a `{status: "success", data}` envelope first.
	pub fn from_payload(payload: &Value) -> Result<Self> {
		let mut payload = payload;

		if let Some(status) = payload.get("status").and_then(Value::as_str)
			&& payload.get("data").is_some()
		{
			if status != "success" {
				return Err(Error::MalformedResponse {
					reason: format!("report envelope has status `{status}`"),
				});
			}

			payload = &payload["data"];
		}

		let Value::Object(map) = payload else {
			return Err(Error::MalformedResponse { reason: "report payload is not an object".into() });
		};

		if is_flat(map) {
			Ok(Self::from_flat(map))
		} else if is_nested(map) {
			Ok(Self::from_nested(map))
		} else {
			Err(Error::MalformedResponse { reason: "report payload has an unrecognized shape".into() })
		}
	}

	/// Placeholder shown when a report could not be loaded.
	pub fn fallback() -> Self {
		Self {
			current_price: 0.,
			trend: TrendAnalysis {
				up: 0.33,
				sideways: 0.34,
				down: 0.33,
				summary: "Data failed to load, please refresh and retry".into(),
			},
			indicators: Map::new(),
			trading_advice: TradingAdvice {
				action: NO_ADVICE.into(),
				reason: "Data failed to load".into(),
				entry_price: 0.,
				stop_loss: 0.,
				take_profit: 0.,
			},
			risk: RiskAssessment {
				level: DEFAULT_RISK_LEVEL.into(),
				score: DEFAULT_RISK_SCORE,
				details: vec!["Data failed to load, risk cannot be assessed".into()],
			},
			last_update_time: now_rfc3339(),
			fallback: true,
		}
	}

	fn from_flat(map: &Map<String, Value>) -> Self {
		Self {
			current_price: number(map.get("current_price"), 0.),
			trend: TrendAnalysis {
				up: number(map.get("trend_up_probability"), 0.),
				sideways: number(map.get("trend_sideways_probability"), 0.),
				down: number(map.get("trend_down_probability"), 0.),
				summary: text(map.get("trend_summary"), NO_DATA),
			},
			indicators: object(map.get("indicators_analysis")),
			trading_advice: TradingAdvice {
				action: text(map.get("trading_action"), NO_ADVICE),
				reason: text(map.get("trading_reason"), NO_DATA),
				entry_price: number(map.get("entry_price"), 0.),
				stop_loss: number(map.get("stop_loss"), 0.),
				take_profit: number(map.get("take_profit"), 0.),
			},
			risk: RiskAssessment {
				level: text(map.get("risk_level"), DEFAULT_RISK_LEVEL),
				score: number(map.get("risk_score"), DEFAULT_RISK_SCORE),
				details: strings(map.get("risk_details")),
			},
			last_update_time: timestamp(map.get("last_update_time")),
			fallback: false,
		}
	}

	fn from_nested(map: &Map<String, Value>) -> Self {
		let trend = map.get("trend_analysis");
		let probabilities = trend.and_then(|t| t.get("probabilities"));
		let advice = map.get("trading_advice");
		let risk = map.get("risk_assessment");
		let field = |section: Option<&Value>, key: &str| section.and_then(|s| s.get(key)).cloned();

		Self {
			current_price: number(map.get("current_price"), 0.),
			trend: TrendAnalysis {
				up: number(field(probabilities, "up").as_ref(), 0.),
				sideways: number(field(probabilities, "sideways").as_ref(), 0.),
				down: number(field(probabilities, "down").as_ref(), 0.),
				summary: text(field(trend, "summary").as_ref(), NO_DATA),
			},
			indicators: object(map.get("indicators_analysis")),
			trading_advice: TradingAdvice {
				action: text(field(advice, "action").as_ref(), NO_ADVICE),
				reason: text(field(advice, "reason").as_ref(), NO_DATA),
				entry_price: number(field(advice, "entry_price").as_ref(), 0.),
				stop_loss: number(field(advice, "stop_loss").as_ref(), 0.),
				take_profit: number(field(advice, "take_profit").as_ref(), 0.),
			},
			risk: RiskAssessment {
				level: text(field(risk, "level").as_ref(), DEFAULT_RISK_LEVEL),
				score: number(field(risk, "score").as_ref(), DEFAULT_RISK_SCORE),
				details: strings(field(risk, "details").as_ref()),
			},
			last_update_time: timestamp(map.get("last_update_time")),
			fallback: false,
		}
	}
}

/// Outcome of a report lookup.
#[derive(Clone, Debug, PartialEq)]
pub enum ReportOutcome {
	/// A report is available.
	Ready(Box<TechnicalAnalysis>),
	/// The server has no report for the symbol yet (`status: "not_found"`).
	NotFound {
		/// Server message, when provided.
		message: Option<String>,
		/// Raw payload for callers that inspect extra fields.
		payload: Value,
	},
}
impl ReportOutcome {
	/// Classifies a report payload, recognizing `status: "not_found"` before normalizing.
	pub fn from_payload(payload: Value) -> Result<Self> {
		if payload.get("status").and_then(Value::as_str) == Some("not_found") {
			let message = payload.get("message").and_then(Value::as_str).map(str::to_owned);

			return Ok(Self::NotFound { message, payload });
		}

		TechnicalAnalysis::from_payload(&payload).map(|report| Self::Ready(Box::new(report)))
	}

	/// Returns the report, if one is available.
	pub fn ready(self) -> Option<TechnicalAnalysis> {
		match self {
			Self::Ready(report) => Some(*report),
			Self::NotFound { .. } => None,
		}
	}
}

/// Converts load failures that should degrade gracefully into [`TechnicalAnalysis::fallback`].
///
/// [`Error::RetriesExhausted`] and [`Error::MalformedResponse`] become the fallback value; every
/// other error (including authentication failures) propagates.
pub fn display_or_fallback(result: Result<TechnicalAnalysis>) -> Result<TechnicalAnalysis> {
	match result {
		Err(Error::RetriesExhausted { .. } | Error::MalformedResponse { .. }) =>
			Ok(TechnicalAnalysis::fallback()),
		other => other,
	}
}

fn is_flat(map: &Map<String, Value>) -> bool {
	["trend_up_probability", "trend_sideways_probability", "trend_down_probability"]
		.iter()
		.all(|key| map.contains_key(*key))
}

fn is_nested(map: &Map<String, Value>) -> bool {
	["trend_analysis", "indicators_analysis", "trading_advice", "risk_assessment"]
		.iter()
		.all(|key| map.contains_key(*key))
}

fn number(value: Option<&Value>, default: f64) -> f64 {
	value.and_then(Value::as_f64).unwrap_or(default)
}

fn text(value: Option<&Value>, default: &str) -> String {
	value.and_then(Value::as_str).unwrap_or(default).to_owned()
}

fn object(value: Option<&Value>) -> Map<String, Value> {
	value.and_then(Value::as_object).cloned().unwrap_or_default()
}

fn strings(value: Option<&Value>) -> Vec<String> {
	value
		.and_then(Value::as_array)
		.map(|items| items.iter().filter_map(Value::as_str).map(str::to_owned).collect())
		.unwrap_or_default()
}

fn timestamp(value: Option<&Value>) -> String {
	value.and_then(Value::as_str).map(str::to_owned).unwrap_or_else(now_rfc3339)
}

fn now_rfc3339() -> String {
	OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}
