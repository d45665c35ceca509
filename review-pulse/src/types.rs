use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single review as handed to the core. `text` is expected to be cleaned
/// already; `rating` may be absent in upstream data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
	pub text: String,
	#[serde(default)]
	pub rating: Option<i64>,
}

impl Review {
	pub fn new(text: impl Into<String>, rating: Option<i64>) -> Self {
		Self {
			text: text.into(),
			rating,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTopic {
	pub topic: String,
	#[serde(default)]
	pub evidence: Vec<String>,
}

impl CandidateTopic {
	pub fn new(topic: impl Into<String>) -> Self {
		Self {
			topic: topic.into(),
			evidence: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTopic {
	#[serde(skip)]
	pub name: String,
	pub aliases: Vec<String>,
	pub created_on: NaiveDate,
	pub last_updated: NaiveDate,
}

/// topic -> date -> count
pub type TrendSnapshot = BTreeMap<String, BTreeMap<NaiveDate, u32>>;

/// Counters describing what a single aggregation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DayOutcome {
	pub date: Option<NaiveDate>,
	pub reviews_seen: usize,
	pub duplicates_skipped: usize,
	pub reviews_counted: usize,
	pub reviews_unmatched: usize,
	pub topics_created: usize,
	pub topics_merged: usize,
}
