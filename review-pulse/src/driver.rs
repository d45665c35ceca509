// ---------------------------------------------------------------------------
// Aggregation Driver — one day's reviews through dedup, canonicalization
// and counting
// ---------------------------------------------------------------------------
//
// Each run is a read-modify-write over the full persisted state: load the
// three stores, mutate them in memory, commit them as one snapshot. No store
// handle outlives a run. A single writer per state directory is assumed.
// ---------------------------------------------------------------------------

use chrono::{Local, NaiveDate};

use crate::config::PulseConfig;
use crate::error::PulseError;
use crate::fingerprint::fingerprint;
use crate::persistence::{SnapshotStore, StoreState};
use crate::report::{self, ReportViews};
use crate::topic_store::Resolution;
use crate::types::{CandidateTopic, DayOutcome, Review};

/// Input for one day of a backfill.
#[derive(Debug, Clone)]
pub struct DayBatch {
	pub date: NaiveDate,
	pub reviews: Vec<Review>,
	pub candidates: Vec<CandidateTopic>,
}

pub struct AggregationDriver {
	snapshots: SnapshotStore,
	seeds: Vec<String>,
	window_days: u32,
	today: NaiveDate,
}

impl AggregationDriver {
	pub fn new(config: &PulseConfig) -> Self {
		Self {
			snapshots: SnapshotStore::new(&config.state_dir),
			seeds: Vec::new(),
			window_days: config.window_days,
			today: Local::now().date_naive(),
		}
	}

	/// Seed topic names applied on every load. Seeding never overwrites
	/// existing topics.
	pub fn with_seeds(mut self, seeds: Vec<String>) -> Self {
		self.seeds = seeds;
		self
	}

	/// Override the wall-clock date used for topic `created_on` /
	/// `last_updated` stamps.
	pub fn with_today(mut self, today: NaiveDate) -> Self {
		self.today = today;
		self
	}

	pub fn window_days(&self) -> u32 {
		self.window_days
	}

	pub fn snapshots(&self) -> &SnapshotStore {
		&self.snapshots
	}

	/// Load the persisted stores and apply seeds. Never fails: unreadable
	/// stores come back empty.
	pub fn load(&self) -> StoreState {
		let mut state = self.snapshots.load();
		let added = state.topics.seed(&self.seeds, self.today);
		if added > 0 {
			tracing::info!(added, "Seeded canonical topics");
		}
		state
	}

	/// Run one aggregation pass for `date` and commit the result.
	///
	/// On a commit failure the previously committed state stays current and
	/// the error names the failed day.
	pub fn run_day(
		&self,
		reviews: &[Review],
		candidates: &[CandidateTopic],
		date: NaiveDate,
	) -> Result<DayOutcome, PulseError> {
		let mut state = self.load();
		let mut outcome = DayOutcome {
			date: Some(date),
			..Default::default()
		};

		for candidate in candidates {
			match state.topics.resolve(&candidate.topic, self.today)? {
				Resolution::Merged(name) => {
					tracing::debug!(candidate = %candidate.topic, canonical = %name, "Merged candidate");
					outcome.topics_merged += 1;
				}
				Resolution::Created(name) => {
					tracing::debug!(canonical = %name, "Created canonical topic");
					outcome.topics_created += 1;
				}
			}
		}

		for name in state.topics.names() {
			state.trends.ensure_topic_date(name, date);
		}

		for review in reviews {
			outcome.reviews_seen += 1;
			let digest = fingerprint(review);
			if state.fingerprints.contains_digest(&digest) {
				outcome.duplicates_skipped += 1;
				continue;
			}
			match state.topics.classify(&review.text) {
				Some(name) => {
					state.trends.increment(name, date)?;
					outcome.reviews_counted += 1;
				}
				None => outcome.reviews_unmatched += 1,
			}
			state.fingerprints.record_digest(digest);
		}

		let evicted = state.trends.apply_retention(date, self.window_days);

		let snapshot = self
			.snapshots
			.commit(&state)
			.map_err(|source| PulseError::Persist { date, source })?;

		tracing::info!(
			%date,
			snapshot = %snapshot,
			seen = outcome.reviews_seen,
			duplicates = outcome.duplicates_skipped,
			counted = outcome.reviews_counted,
			unmatched = outcome.reviews_unmatched,
			topics_created = outcome.topics_created,
			topics_merged = outcome.topics_merged,
			evicted,
			"Aggregation pass committed"
		);
		Ok(outcome)
	}

	/// Run consecutive batches in order, stopping at the first failure.
	pub fn backfill(&self, batches: impl IntoIterator<Item = DayBatch>) -> Result<Vec<DayOutcome>, PulseError> {
		let mut outcomes = Vec::new();
		for batch in batches {
			let outcome = self
				.run_day(&batch.reviews, &batch.candidates, batch.date)
				.inspect_err(|e| tracing::error!(date = %batch.date, error = %e, "Aggregation pass failed"))?;
			outcomes.push(outcome);
		}
		Ok(outcomes)
	}

	/// Render the committed trend window ending at `target_date`.
	pub fn report(&self, target_date: NaiveDate) -> Result<ReportViews, PulseError> {
		let state = self.snapshots.load();
		report::render(state.trends.snapshot(), target_date, self.window_days)
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
