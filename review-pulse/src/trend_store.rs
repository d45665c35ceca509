// ---------------------------------------------------------------------------
// Trend Store — sparse topic -> date -> count series with retention
// ---------------------------------------------------------------------------

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::PulseError;
use crate::types::TrendSnapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrendStore {
	trends: TrendSnapshot,
}

impl TrendStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a zero entry for `(topic, date)` unless one exists.
	pub fn ensure_topic_date(&mut self, topic: &str, date: NaiveDate) {
		self.trends
			.entry(topic.to_string())
			.or_default()
			.entry(date)
			.or_insert(0);
	}

	/// Add one to `(topic, date)`. The pair must have been ensured first.
	pub fn increment(&mut self, topic: &str, date: NaiveDate) -> Result<u32, PulseError> {
		let count = self
			.trends
			.get_mut(topic)
			.and_then(|dates| dates.get_mut(&date))
			.ok_or_else(|| PulseError::UnknownTopic {
				topic: topic.to_string(),
				date,
			})?;
		*count += 1;
		Ok(*count)
	}

	/// Drop every entry strictly older than `as_of - window_days`. Topics
	/// left without entries stay in the store.
	pub fn apply_retention(&mut self, as_of: NaiveDate, window_days: u32) -> usize {
		let Some(cutoff) = as_of.checked_sub_days(Days::new(u64::from(window_days))) else {
			return 0;
		};
		let mut evicted = 0;
		for dates in self.trends.values_mut() {
			let before = dates.len();
			dates.retain(|d, _| *d >= cutoff);
			evicted += before - dates.len();
		}
		evicted
	}

	pub fn count(&self, topic: &str, date: NaiveDate) -> Option<u32> {
		self.trends.get(topic).and_then(|dates| dates.get(&date)).copied()
	}

	pub fn snapshot(&self) -> &TrendSnapshot {
		&self.trends
	}

	pub fn topic_count(&self) -> usize {
		self.trends.len()
	}
}
