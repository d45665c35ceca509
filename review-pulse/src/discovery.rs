// ---------------------------------------------------------------------------
// Heuristic candidate-topic discovery
// ---------------------------------------------------------------------------
//
// Turns cleaned reviews into candidate topics with supporting evidence.
// A review is attributed to the first seed topic sharing a word with it,
// otherwise to the first keyword topic whose primary and (optional)
// secondary keyword lists both hit. Reviews matching neither are ignored.
// ---------------------------------------------------------------------------

use crate::types::{CandidateTopic, Review};

/// A keyword rule: any `primary` substring must appear, and if
/// `secondary` is non-empty, one of those must appear too.
#[derive(Debug, Clone)]
pub struct KeywordTopic {
	pub topic: String,
	pub primary: Vec<String>,
	pub secondary: Vec<String>,
}

impl KeywordTopic {
	pub fn new(topic: &str, primary: &[&str], secondary: &[&str]) -> Self {
		Self {
			topic: topic.to_string(),
			primary: primary.iter().map(|s| s.to_string()).collect(),
			secondary: secondary.iter().map(|s| s.to_string()).collect(),
		}
	}

	fn matches(&self, text: &str) -> bool {
		self.primary.iter().any(|p| text.contains(p.as_str()))
			&& (self.secondary.is_empty() || self.secondary.iter().any(|s| text.contains(s.as_str())))
	}
}

/// The built-in keyword rules for food-delivery app reviews.
pub fn default_keyword_topics() -> Vec<KeywordTopic> {
	vec![
		KeywordTopic::new(
			"App stability & performance issues",
			&["app", "application"],
			&["crash", "freeze", "hang", "lag", "slow", "bug", "glitch"],
		),
		KeywordTopic::new(
			"Login / authentication issue",
			&["login", "signin", "otp", "verification"],
			&["fail", "error", "issue"],
		),
		KeywordTopic::new("Issue after app update", &["update"], &["issue", "problem", "broke", "worse"]),
		KeywordTopic::new(
			"Payment failure",
			&["payment", "upi", "card", "netbanking"],
			&["fail", "error", "declined"],
		),
		KeywordTopic::new("Refund not received", &["refund", "money"], &["not received", "pending", "delay"]),
		KeywordTopic::new(
			"Incorrect charges",
			&["charged", "deducted", "double", "extra charge", "hidden fee"],
			&[],
		),
		KeywordTopic::new("High pricing concerns", &["price", "cost", "expensive", "costly"], &[]),
		KeywordTopic::new(
			"Customer support issue",
			&["support", "customer care", "helpdesk"],
			&["rude", "bad", "unhelpful", "no response", "ignored"],
		),
		KeywordTopic::new("Account suspension issue", &["account", "profile"], &["blocked", "suspended"]),
		KeywordTopic::new("Unfair policy concern", &["policy", "rules", "terms"], &["unfair", "bad"]),
		KeywordTopic::new(
			"Feature request",
			&["add", "feature", "should have", "wish", "bring back", "old version", "remove"],
			&[],
		),
	]
}

// ---------------------------------------------------------------------------
// TopicDiscovery
// ---------------------------------------------------------------------------

pub struct TopicDiscovery {
	seeds: Vec<String>,
	keyword_topics: Vec<KeywordTopic>,
}

impl TopicDiscovery {
	pub fn new(seeds: Vec<String>) -> Self {
		Self::with_keyword_topics(seeds, default_keyword_topics())
	}

	pub fn with_keyword_topics(seeds: Vec<String>, keyword_topics: Vec<KeywordTopic>) -> Self {
		Self {
			seeds,
			keyword_topics,
		}
	}

	fn match_seed(&self, text: &str) -> Option<&str> {
		self.seeds
			.iter()
			.find(|seed| seed.to_lowercase().split_whitespace().any(|w| text.contains(w)))
			.map(String::as_str)
	}

	fn match_keyword(&self, text: &str) -> Option<&str> {
		self.keyword_topics
			.iter()
			.find(|k| k.matches(text))
			.map(|k| k.topic.as_str())
	}

	/// Attribute each review to at most one candidate topic. Candidates are
	/// returned in the order they were first seen.
	pub fn discover(&self, reviews: &[Review]) -> Vec<CandidateTopic> {
		let mut found: Vec<CandidateTopic> = Vec::new();
		for review in reviews {
			if review.text.is_empty() {
				continue;
			}
			let text = review.text.to_lowercase();
			let Some(topic) = self.match_seed(&text).or_else(|| self.match_keyword(&text)) else {
				continue;
			};
			match found.iter_mut().find(|c| c.topic == topic) {
				Some(candidate) => candidate.evidence.push(review.text.clone()),
				None => found.push(CandidateTopic {
					topic: topic.to_string(),
					evidence: vec![review.text.clone()],
				}),
			}
		}
		found
	}
}
