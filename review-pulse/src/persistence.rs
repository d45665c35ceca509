// ---------------------------------------------------------------------------
// Snapshot persistence for the three aggregation stores
// ---------------------------------------------------------------------------
//
// On-disk layout under the state directory:
//
//   CURRENT                       name of the committed snapshot
//   snapshots/<id>/seen_reviews.json
//   snapshots/<id>/topics.json
//   snapshots/<id>/trends.json
//   seed_topics.json              optional seed topic names
//
// A commit writes all three documents into a fresh snapshot directory and
// only then swaps `CURRENT` with a rename. Until that rename lands, readers
// keep seeing the previous snapshot in full.
// ---------------------------------------------------------------------------

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::fingerprint::FingerprintIndex;
use crate::topic_store::TopicStore;
use crate::trend_store::TrendStore;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PersistenceError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Corruption: {0}")]
	Corruption(String),
	#[error("Serialization: {0}")]
	Serialization(String),
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const CURRENT_FILE: &str = "CURRENT";
pub const CURRENT_TMP_FILE: &str = "CURRENT.tmp";
pub const SNAPSHOTS_DIR: &str = "snapshots";
pub const SEEN_REVIEWS_FILE: &str = "seen_reviews.json";
pub const TOPICS_FILE: &str = "topics.json";
pub const TRENDS_FILE: &str = "trends.json";
pub const SEED_TOPICS_FILE: &str = "seed_topics.json";

// ---------------------------------------------------------------------------
// Loaded state
// ---------------------------------------------------------------------------

/// The three stores as loaded from (or about to be written to) disk.
#[derive(Debug, Default)]
pub struct StoreState {
	pub fingerprints: FingerprintIndex,
	pub topics: TopicStore,
	pub trends: TrendStore,
}

// ---------------------------------------------------------------------------
// Document helpers
// ---------------------------------------------------------------------------

/// Read a JSON document. A missing file yields `Ok(None)`; an empty file
/// is treated the same way.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
	let raw = match fs::read_to_string(path) {
		Ok(raw) => raw,
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
		Err(e) => return Err(PersistenceError::Io(e)),
	};
	if raw.trim().is_empty() {
		return Ok(None);
	}
	serde_json::from_str(&raw)
		.map(Some)
		.map_err(|e| PersistenceError::Corruption(format!("{}: {}", path.display(), e)))
}

/// Load a document, falling back to `T::default()` when it is missing or
/// unreadable. Corrupt state is logged and never fatal.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
	match read_document(path) {
		Ok(Some(value)) => value,
		Ok(None) => {
			tracing::debug!(path = %path.display(), "No persisted document, starting empty");
			T::default()
		}
		Err(e) => {
			tracing::warn!(path = %path.display(), error = %e, "Unreadable persisted document, starting empty");
			T::default()
		}
	}
}

/// Serialize `value` as pretty JSON into `path` and fsync it.
fn write_document_synced<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistenceError> {
	let file = File::create(path)?;
	let mut writer = BufWriter::new(file);
	serde_json::to_writer_pretty(&mut writer, value).map_err(|e| {
		PersistenceError::Serialization(format!("{}: {}", path.display(), e))
	})?;
	writer.flush()?;
	let file = writer
		.into_inner()
		.map_err(|e| PersistenceError::Io(e.into_error()))?;
	file.sync_all()?;
	Ok(())
}

/// Replace `path` with `bytes` through a sibling temp file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
	let dir = path.parent().unwrap_or_else(|| Path::new("."));
	fs::create_dir_all(dir)?;
	let file_name = path
		.file_name()
		.and_then(|n| n.to_str())
		.ok_or_else(|| PersistenceError::Serialization(format!("invalid path: {}", path.display())))?;
	let tmp = dir.join(format!(".{file_name}.tmp"));
	{
		let mut file = File::create(&tmp)?;
		file.write_all(bytes)?;
		file.sync_all()?;
	}
	fs::rename(&tmp, path)?;
	Ok(())
}

fn sync_dir(dir: &Path) {
	// Not supported on every platform; the rename itself is what matters.
	if let Ok(handle) = File::open(dir) {
		let _ = handle.sync_all();
	}
}

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

/// Owns the state directory for one run. Nothing here is cached between
/// calls; every load reads from disk.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
	root: PathBuf,
}

impl SnapshotStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn snapshots_dir(&self) -> PathBuf {
		self.root.join(SNAPSHOTS_DIR)
	}

	/// Name of the committed snapshot, if any.
	pub fn current_snapshot(&self) -> Result<Option<String>, PersistenceError> {
		let raw = match fs::read_to_string(self.root.join(CURRENT_FILE)) {
			Ok(raw) => raw,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(PersistenceError::Io(e)),
		};
		let name = raw.trim();
		if name.is_empty() {
			return Ok(None);
		}
		if name.contains(|c: char| c == '/' || c == '\\') || name.starts_with('.') {
			return Err(PersistenceError::Corruption(format!(
				"invalid snapshot name in {CURRENT_FILE}: {name}"
			)));
		}
		Ok(Some(name.to_string()))
	}

	/// Load all three stores from the committed snapshot. Each store falls
	/// back to empty independently.
	pub fn load(&self) -> StoreState {
		let snapshot = match self.current_snapshot() {
			Ok(Some(name)) => name,
			Ok(None) => {
				tracing::info!(root = %self.root.display(), "No committed snapshot, starting from empty state");
				return StoreState::default();
			}
			Err(e) => {
				tracing::warn!(root = %self.root.display(), error = %e, "Unreadable snapshot pointer, starting from empty state");
				return StoreState::default();
			}
		};

		let dir = self.snapshots_dir().join(&snapshot);
		let state = StoreState {
			fingerprints: load_or_default(&dir.join(SEEN_REVIEWS_FILE)),
			topics: load_or_default(&dir.join(TOPICS_FILE)),
			trends: load_or_default(&dir.join(TRENDS_FILE)),
		};
		tracing::debug!(
			snapshot = %snapshot,
			fingerprints = state.fingerprints.len(),
			topics = state.topics.len(),
			trend_topics = state.trends.topic_count(),
			"Loaded snapshot"
		);
		state
	}

	/// Write all three stores as a new snapshot and make it current.
	/// Returns the new snapshot name.
	pub fn commit(&self, state: &StoreState) -> Result<String, PersistenceError> {
		let snapshots = self.snapshots_dir();
		fs::create_dir_all(&snapshots)?;

		let name = Uuid::new_v4().to_string();
		let staging = snapshots.join(&name);
		fs::create_dir(&staging)?;

		write_document_synced(&staging.join(SEEN_REVIEWS_FILE), &state.fingerprints)?;
		write_document_synced(&staging.join(TOPICS_FILE), &state.topics)?;
		write_document_synced(&staging.join(TRENDS_FILE), &state.trends)?;
		sync_dir(&staging);

		let tmp = self.root.join(CURRENT_TMP_FILE);
		{
			let mut file = File::create(&tmp)?;
			file.write_all(name.as_bytes())?;
			file.sync_all()?;
		}
		fs::rename(&tmp, self.root.join(CURRENT_FILE))?;
		sync_dir(&self.root);

		tracing::debug!(snapshot = %name, "Committed snapshot");
		self.prune(&name);
		Ok(name)
	}

	/// Remove every snapshot directory except `keep`. Best effort.
	fn prune(&self, keep: &str) {
		let entries = match fs::read_dir(self.snapshots_dir()) {
			Ok(entries) => entries,
			Err(e) => {
				tracing::warn!(error = %e, "Could not list snapshots for pruning");
				return;
			}
		};
		for entry in entries.flatten() {
			if entry.file_name().to_str() == Some(keep) {
				continue;
			}
			if let Err(e) = fs::remove_dir_all(entry.path()) {
				tracing::warn!(path = %entry.path().display(), error = %e, "Could not prune stale snapshot");
			}
		}
	}

	/// Drop all committed state. Seed topics are left in place.
	pub fn reset(&self) -> Result<(), PersistenceError> {
		for file in [CURRENT_FILE, CURRENT_TMP_FILE] {
			match fs::remove_file(self.root.join(file)) {
				Ok(()) => {}
				Err(e) if e.kind() == ErrorKind::NotFound => {}
				Err(e) => return Err(e.into()),
			}
		}
		match fs::remove_dir_all(self.snapshots_dir()) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}

/// Read seed topic names (a JSON array of strings). A missing file means
/// no seeds.
pub fn load_seed_names(path: &Path) -> Result<Vec<String>, PersistenceError> {
	Ok(read_document::<Vec<String>>(path)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::Review;
	use chrono::NaiveDate;

	fn day(d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
	}

	fn sample_state() -> StoreState {
		let mut state = StoreState::default();
		state.fingerprints.record(&Review::new("app keeps crashing", Some(1)));
		state.topics.seed(&["zeta", "alpha"], day(1));
		state.topics.merge("alpha", "first", day(2)).unwrap();
		state.trends.ensure_topic_date("alpha", day(2));
		state.trends.increment("alpha", day(2)).unwrap();
		state
	}

	#[test]
	fn load_without_snapshot_is_empty() {
		let dir = tempfile::tempdir().unwrap();
		let state = SnapshotStore::new(dir.path()).load();
		assert!(state.fingerprints.is_empty());
		assert!(state.topics.is_empty());
		assert_eq!(state.trends.topic_count(), 0);
	}

	#[test]
	fn commit_then_load_roundtrip() {
		let dir = tempfile::tempdir().unwrap();
		let store = SnapshotStore::new(dir.path().join("state"));
		let name = store.commit(&sample_state()).unwrap();

		assert_eq!(store.current_snapshot().unwrap(), Some(name.clone()));
		let snap_dir = store.snapshots_dir().join(&name);
		assert!(snap_dir.join(SEEN_REVIEWS_FILE).exists());
		assert!(snap_dir.join(TOPICS_FILE).exists());
		assert!(snap_dir.join(TRENDS_FILE).exists());

		let loaded = store.load();
		assert_eq!(loaded.fingerprints.len(), 1);
		let names: Vec<&str> = loaded.topics.names().collect();
		assert_eq!(names, vec!["zeta", "alpha"]);
		assert_eq!(loaded.trends.count("alpha", day(2)), Some(1));
	}

	#[test]
	fn persisted_documents_have_documented_shape() {
		let dir = tempfile::tempdir().unwrap();
		let store = SnapshotStore::new(dir.path());
		let name = store.commit(&sample_state()).unwrap();
		let snap_dir = store.snapshots_dir().join(name);

		let seen: serde_json::Value =
			serde_json::from_str(&fs::read_to_string(snap_dir.join(SEEN_REVIEWS_FILE)).unwrap()).unwrap();
		assert_eq!(seen.as_array().unwrap()[0].as_str().unwrap().len(), 64);

		let topics: serde_json::Value =
			serde_json::from_str(&fs::read_to_string(snap_dir.join(TOPICS_FILE)).unwrap()).unwrap();
		assert_eq!(topics["alpha"]["aliases"][0], "first");
		assert_eq!(topics["alpha"]["created_on"], "2024-01-01");
		assert_eq!(topics["alpha"]["last_updated"], "2024-01-02");

		let trends: serde_json::Value =
			serde_json::from_str(&fs::read_to_string(snap_dir.join(TRENDS_FILE)).unwrap()).unwrap();
		assert_eq!(trends["alpha"]["2024-01-02"], 1);
	}

	#[test]
	fn commit_prunes_older_snapshots() {
		let dir = tempfile::tempdir().unwrap();
		let store = SnapshotStore::new(dir.path());
		store.commit(&sample_state()).unwrap();
		let latest = store.commit(&sample_state()).unwrap();

		let remaining: Vec<String> = fs::read_dir(store.snapshots_dir())
			.unwrap()
			.flatten()
			.map(|e| e.file_name().to_string_lossy().into_owned())
			.collect();
		assert_eq!(remaining, vec![latest]);
	}

	#[test]
	fn corrupt_store_falls_back_per_store() {
		let dir = tempfile::tempdir().unwrap();
		let store = SnapshotStore::new(dir.path());
		let name = store.commit(&sample_state()).unwrap();
		fs::write(store.snapshots_dir().join(name).join(TRENDS_FILE), "{not json").unwrap();

		let loaded = store.load();
		assert_eq!(loaded.trends.topic_count(), 0);
		assert_eq!(loaded.topics.len(), 2);
		assert_eq!(loaded.fingerprints.len(), 1);
	}

	#[test]
	fn failed_pointer_swap_keeps_previous_snapshot() {
		let dir = tempfile::tempdir().unwrap();
		let store = SnapshotStore::new(dir.path());
		let first = store.commit(&sample_state()).unwrap();

		// A directory squatting on the temp pointer makes the swap fail.
		fs::create_dir(dir.path().join(CURRENT_TMP_FILE)).unwrap();
		let mut next = sample_state();
		next.topics.seed(&["brand new"], day(3));
		assert!(store.commit(&next).is_err());

		assert_eq!(store.current_snapshot().unwrap(), Some(first));
		let loaded = store.load();
		assert!(!loaded.topics.contains("brand new"));
		assert_eq!(loaded.topics.len(), 2);
	}

	#[test]
	fn reset_clears_snapshots_but_keeps_seeds() {
		let dir = tempfile::tempdir().unwrap();
		let store = SnapshotStore::new(dir.path());
		fs::write(dir.path().join(SEED_TOPICS_FILE), r#"["Refund not received"]"#).unwrap();
		store.commit(&sample_state()).unwrap();

		store.reset().unwrap();
		assert_eq!(store.current_snapshot().unwrap(), None);
		assert!(!store.snapshots_dir().exists());
		assert_eq!(load_seed_names(&dir.path().join(SEED_TOPICS_FILE)).unwrap(), vec!["Refund not received"]);
	}

	#[test]
	fn write_atomic_replaces_content() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("out").join("report.json");
		write_atomic(&path, b"first").unwrap();
		write_atomic(&path, b"second").unwrap();
		assert_eq!(fs::read_to_string(&path).unwrap(), "second");
		assert!(!dir.path().join("out").join(".report.json.tmp").exists());
	}

	#[test]
	fn missing_seed_file_means_no_seeds() {
		let dir = tempfile::tempdir().unwrap();
		assert!(load_seed_names(&dir.path().join("nope.json")).unwrap().is_empty());
	}
}
