// ---------------------------------------------------------------------------
// Topic Canonical Store — canonical topic names with alias tracking
// ---------------------------------------------------------------------------
//
// Topics are kept in insertion order. Every lookup that can hit more than
// one topic resolves to the earliest inserted one, and the persisted JSON
// object is written and read back in that same order.
//
// Candidate matching goes through the `TopicMatcher` trait. The default
// `ExactAliasMatcher` compares case-insensitively against names and
// aliases; a similarity-based matcher can be swapped in with
// `TopicStore::with_matcher` without touching callers.
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PulseError;
use crate::types::CanonicalTopic;

// ---------------------------------------------------------------------------
// Matching strategy
// ---------------------------------------------------------------------------

/// Decides whether a candidate phrase names an existing canonical topic.
///
/// Implementations must return the first qualifying topic in slice order.
pub trait TopicMatcher: Send + Sync {
	fn find<'a>(&self, candidate: &str, topics: &'a [CanonicalTopic]) -> Option<&'a CanonicalTopic>;
}

/// Case-insensitive equality against a topic's name or any of its aliases.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactAliasMatcher;

impl TopicMatcher for ExactAliasMatcher {
	fn find<'a>(&self, candidate: &str, topics: &'a [CanonicalTopic]) -> Option<&'a CanonicalTopic> {
		let needle = candidate.to_lowercase();
		topics.iter().find(|t| {
			t.name.to_lowercase() == needle || t.aliases.iter().any(|a| a.to_lowercase() == needle)
		})
	}
}

/// What `TopicStore::resolve` did with a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
	Merged(String),
	Created(String),
}

impl Resolution {
	pub fn name(&self) -> &str {
		match self {
			Self::Merged(name) | Self::Created(name) => name,
		}
	}
}

// ---------------------------------------------------------------------------
// TopicStore
// ---------------------------------------------------------------------------

pub struct TopicStore {
	topics: Vec<CanonicalTopic>,
	/// name -> position in `topics`
	index: HashMap<String, usize>,
	matcher: Box<dyn TopicMatcher>,
}

impl TopicStore {
	pub fn new() -> Self {
		Self {
			topics: Vec::new(),
			index: HashMap::new(),
			matcher: Box::new(ExactAliasMatcher),
		}
	}

	/// Replace the candidate matching strategy.
	pub fn with_matcher(mut self, matcher: impl TopicMatcher + 'static) -> Self {
		self.matcher = Box::new(matcher);
		self
	}

	fn from_topics(topics: Vec<CanonicalTopic>) -> Self {
		let mut store = Self::new();
		for topic in topics {
			if store.index.contains_key(&topic.name) {
				continue;
			}
			store.index.insert(topic.name.clone(), store.topics.len());
			store.topics.push(topic);
		}
		store
	}

	fn insert(&mut self, name: &str, today: NaiveDate) {
		self.index.insert(name.to_string(), self.topics.len());
		self.topics.push(CanonicalTopic {
			name: name.to_string(),
			aliases: Vec::new(),
			created_on: today,
			last_updated: today,
		});
	}

	// -- Contract ------------------------------------------------------------

	/// Position of the topic holding `text` as its exact name or one of its
	/// aliases.
	fn owner_of(&self, text: &str) -> Option<usize> {
		self.index.get(text).copied().or_else(|| {
			self.topics
				.iter()
				.position(|t| t.aliases.iter().any(|a| a == text))
		})
	}

	/// Insert each seed name not already held as a name or alias. Existing
	/// entries are never touched.
	pub fn seed<S: AsRef<str>>(&mut self, names: &[S], today: NaiveDate) -> usize {
		let mut added = 0;
		for name in names {
			let name = name.as_ref().trim();
			if name.is_empty() || self.owner_of(name).is_some() {
				continue;
			}
			self.insert(name, today);
			added += 1;
		}
		added
	}

	/// Return the canonical name `candidate` refers to, if any.
	pub fn match_candidate(&self, candidate: &str) -> Option<&str> {
		self.matcher
			.find(candidate, &self.topics)
			.map(|t| t.name.as_str())
	}

	/// Fold `candidate` into `name` as an alias and bump `last_updated`.
	///
	/// The alias is not recorded if it equals the topic's own name or if
	/// another topic already owns the exact same string as name or alias.
	pub fn merge(&mut self, name: &str, candidate: &str, today: NaiveDate) -> Result<bool, PulseError> {
		let pos = *self
			.index
			.get(name)
			.ok_or_else(|| PulseError::UnknownCanonical(name.to_string()))?;

		let owned_elsewhere = self.owner_of(candidate).is_some_and(|owner| owner != pos);

		let topic = &mut self.topics[pos];
		topic.last_updated = today;
		if candidate == topic.name || owned_elsewhere || topic.aliases.iter().any(|a| a == candidate) {
			return Ok(false);
		}
		topic.aliases.push(candidate.to_string());
		Ok(true)
	}

	/// Insert `candidate` itself as a new canonical topic. No-op if the
	/// exact name already exists.
	pub fn create_new(&mut self, candidate: &str, today: NaiveDate) -> bool {
		if self.index.contains_key(candidate) {
			return false;
		}
		self.insert(candidate, today);
		true
	}

	/// Match, then merge on a hit or create on a miss.
	pub fn resolve(&mut self, candidate: &str, today: NaiveDate) -> Result<Resolution, PulseError> {
		let candidate = candidate.trim();
		match self.match_candidate(candidate).map(str::to_string) {
			Some(name) => {
				self.merge(&name, candidate, today)?;
				Ok(Resolution::Merged(name))
			}
			None => {
				self.create_new(candidate, today);
				Ok(Resolution::Created(candidate.to_string()))
			}
		}
	}

	// -- Count-time classification -------------------------------------------

	/// First topic, in store order, where any whitespace-delimited word of
	/// its name or one of its aliases occurs in `text` (case-insensitive
	/// substring match).
	pub fn classify(&self, text: &str) -> Option<&str> {
		let haystack = text.to_lowercase();
		self.topics
			.iter()
			.find(|t| {
				std::iter::once(&t.name)
					.chain(t.aliases.iter())
					.any(|phrase| {
						phrase
							.to_lowercase()
							.split_whitespace()
							.any(|word| haystack.contains(word))
					})
			})
			.map(|t| t.name.as_str())
	}

	// -- Accessors -----------------------------------------------------------

	pub fn get(&self, name: &str) -> Option<&CanonicalTopic> {
		self.index.get(name).map(|&i| &self.topics[i])
	}

	pub fn contains(&self, name: &str) -> bool {
		self.index.contains_key(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.topics.iter().map(|t| t.name.as_str())
	}

	pub fn topics(&self) -> &[CanonicalTopic] {
		&self.topics
	}

	pub fn len(&self) -> usize {
		self.topics.len()
	}

	pub fn is_empty(&self) -> bool {
		self.topics.is_empty()
	}
}

impl Default for TopicStore {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for TopicStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TopicStore")
			.field("topics", &self.topics)
			.finish_non_exhaustive()
	}
}

// ---------------------------------------------------------------------------
// Ordered JSON object (de)serialization
// ---------------------------------------------------------------------------

impl Serialize for TopicStore {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.topics.len()))?;
		for topic in &self.topics {
			map.serialize_entry(&topic.name, topic)?;
		}
		map.end()
	}
}

struct TopicStoreVisitor;

impl<'de> Visitor<'de> for TopicStoreVisitor {
	type Value = TopicStore;

	fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str("an object keyed by canonical topic name")
	}

	fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
		let mut topics = Vec::with_capacity(access.size_hint().unwrap_or(0));
		while let Some((name, mut topic)) = access.next_entry::<String, CanonicalTopic>()? {
			topic.name = name;
			topics.push(topic);
		}
		Ok(TopicStore::from_topics(topics))
	}
}

impl<'de> Deserialize<'de> for TopicStore {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		deserializer.deserialize_map(TopicStoreVisitor)
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	fn day(d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
	}

	#[test]
	fn seed_is_idempotent() {
		let mut store = TopicStore::new();
		assert_eq!(store.seed(&["Refund not received", "Payment failure"], day(1)), 2);
		store.merge("Payment failure", "upi failed", day(2)).unwrap();

		assert_eq!(store.seed(&["Payment failure", "Refund not received"], day(3)), 0);
		let topic = store.get("Payment failure").unwrap();
		assert_eq!(topic.aliases, vec!["upi failed".to_string()]);
		assert_eq!(topic.created_on, day(1));
		assert_eq!(topic.last_updated, day(2));
	}

	#[test]
	fn seed_skips_names_held_as_alias() {
		let mut store = TopicStore::new();
		store.seed(&["Payment failure"], day(1));
		store.merge("Payment failure", "UPI failed", day(2)).unwrap();

		assert_eq!(store.seed(&["UPI failed", "App crash"], day(3)), 1);
		assert_eq!(store.names().collect::<Vec<_>>(), vec!["Payment failure", "App crash"]);
		assert!(!store.contains("UPI failed"));
	}

	#[test]
	fn match_is_case_insensitive_on_name_and_alias() {
		let mut store = TopicStore::new();
		store.seed(&["Delivery partner rude"], day(1));
		store.merge("Delivery partner rude", "delivery guy shouted", day(1)).unwrap();

		assert_eq!(store.match_candidate("DELIVERY PARTNER RUDE"), Some("Delivery partner rude"));
		assert_eq!(store.match_candidate("Delivery Guy Shouted"), Some("Delivery partner rude"));
		assert_eq!(store.match_candidate("delivery guy"), None);
	}

	#[test]
	fn unmatched_candidate_creates_topic() {
		let mut store = TopicStore::new();
		let res = store.resolve("delivery guy shouted", day(5)).unwrap();
		assert_eq!(res, Resolution::Created("delivery guy shouted".into()));

		let topic = store.get("delivery guy shouted").unwrap();
		assert!(topic.aliases.is_empty());
		assert_eq!(topic.created_on, day(5));
		assert_eq!(topic.last_updated, day(5));
	}

	#[test]
	fn matched_candidate_merges_alias_once() {
		let mut store = TopicStore::new();
		store.seed(&["Late delivery"], day(1));
		store.merge("Late delivery", "order came late", day(2)).unwrap();

		let res = store.resolve("ORDER CAME LATE", day(3)).unwrap();
		assert_eq!(res, Resolution::Merged("Late delivery".into()));
		let res = store.resolve("ORDER CAME LATE", day(4)).unwrap();
		assert_eq!(res.name(), "Late delivery");

		let topic = store.get("Late delivery").unwrap();
		assert_eq!(topic.aliases, vec!["order came late", "ORDER CAME LATE"]);
		assert_eq!(topic.last_updated, day(4));
	}

	#[test]
	fn merging_own_name_does_not_add_alias() {
		let mut store = TopicStore::new();
		store.seed(&["Refund not received"], day(1));
		assert!(!store.merge("Refund not received", "Refund not received", day(2)).unwrap());
		let topic = store.get("Refund not received").unwrap();
		assert!(topic.aliases.is_empty());
		assert_eq!(topic.last_updated, day(2));
	}

	#[test]
	fn merge_into_unknown_topic_is_contract_violation() {
		let mut store = TopicStore::new();
		let err = store.merge("ghost", "boo", day(1)).unwrap_err();
		assert!(err.is_contract_violation());
	}

	#[test]
	fn first_inserted_topic_wins_ties() {
		let mut store = TopicStore::new();
		store.seed(&["App crash", "Crash on login"], day(1));
		store.merge("App crash", "crashes", day(1)).unwrap();
		// Second topic cannot claim an alias the first already owns.
		assert!(!store.merge("Crash on login", "crashes", day(1)).unwrap());
		assert_eq!(store.match_candidate("crashes"), Some("App crash"));
	}

	#[test]
	fn aliases_stay_unique_across_topics() {
		let mut store = TopicStore::new();
		store.seed(&["alpha", "beta"], day(1));
		for candidate in ["a1", "Alpha", "b1", "a1", "BETA", "b1", "new one", "NEW ONE"] {
			store.resolve(candidate, day(2)).unwrap();
		}
		store.merge("beta", "a1", day(3)).unwrap();

		let mut owners: HashSet<&str> = HashSet::new();
		for topic in store.topics() {
			for alias in &topic.aliases {
				assert!(owners.insert(alias.as_str()), "alias {alias} owned twice");
			}
		}
	}

	#[test]
	fn classify_uses_words_of_name_and_aliases() {
		let mut store = TopicStore::new();
		store.seed(&["Refund not received", "Payment failure"], day(1));
		store.merge("Payment failure", "upi", day(1)).unwrap();

		assert_eq!(store.classify("still waiting for my REFUND"), Some("Refund not received"));
		assert_eq!(store.classify("upi broken again"), Some("Payment failure"));
		assert_eq!(store.classify("great food"), None);
	}

	#[test]
	fn classify_prefers_store_order() {
		let mut store = TopicStore::new();
		store.seed(&["slow app", "slow delivery"], day(1));
		assert_eq!(store.classify("delivery was slow"), Some("slow app"));
	}

	#[test]
	fn serde_roundtrip_preserves_order() {
		let mut store = TopicStore::new();
		store.seed(&["zeta", "alpha", "mid"], day(1));
		store.merge("alpha", "first letter", day(2)).unwrap();

		let json = serde_json::to_string(&store).unwrap();
		assert!(json.find("zeta").unwrap() < json.find("alpha").unwrap());
		assert!(json.contains("\"created_on\":\"2024-01-01\""));

		let restored: TopicStore = serde_json::from_str(&json).unwrap();
		let names: Vec<&str> = restored.names().collect();
		assert_eq!(names, vec!["zeta", "alpha", "mid"]);
		assert_eq!(restored.get("alpha").unwrap().aliases, vec!["first letter"]);
		assert_eq!(restored.match_candidate("FIRST LETTER"), Some("alpha"));
	}

	struct PrefixMatcher;

	impl TopicMatcher for PrefixMatcher {
		fn find<'a>(&self, candidate: &str, topics: &'a [CanonicalTopic]) -> Option<&'a CanonicalTopic> {
			topics.iter().find(|t| candidate.starts_with(t.name.as_str()))
		}
	}

	#[test]
	fn matcher_strategy_is_pluggable() {
		let mut store = TopicStore::new().with_matcher(PrefixMatcher);
		store.seed(&["refund"], day(1));
		let res = store.resolve("refund pending for weeks", day(2)).unwrap();
		assert_eq!(res, Resolution::Merged("refund".into()));
	}
}
