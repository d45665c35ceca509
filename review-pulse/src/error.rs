use chrono::NaiveDate;
use thiserror::Error;

use crate::persistence::PersistenceError;

#[derive(Debug, Error)]
pub enum PulseError {
	#[error("Unknown topic/date pair: '{topic}' on {date} was never initialized")]
	UnknownTopic { topic: String, date: NaiveDate },
	#[error("Unknown canonical topic: {0}")]
	UnknownCanonical(String),
	#[error("Failed to persist state for {date}: {source}")]
	Persist {
		date: NaiveDate,
		#[source]
		source: PersistenceError,
	},
	#[error("Invalid date: {0}")]
	InvalidDate(String),
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl PulseError {
	pub fn code(&self) -> &str {
		match self {
			Self::UnknownTopic { .. } => "PULSE_UNKNOWN_TOPIC",
			Self::UnknownCanonical(_) => "PULSE_UNKNOWN_CANONICAL",
			Self::Persist { .. } => "PULSE_PERSIST_FAILED",
			Self::InvalidDate(_) => "PULSE_INVALID_DATE",
			Self::InvalidInput(_) => "PULSE_INVALID_INPUT",
			Self::Io(_) => "PULSE_IO",
			Self::Json(_) => "PULSE_JSON",
		}
	}

	/// True for programming-contract violations, which must never be
	/// swallowed by callers.
	pub fn is_contract_violation(&self) -> bool {
		matches!(self, Self::UnknownTopic { .. } | Self::UnknownCanonical(_))
	}
}

/// Parse an ISO `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, PulseError> {
	NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
		.map_err(|e| PulseError::InvalidDate(format!("{raw}: {e}")))
}
