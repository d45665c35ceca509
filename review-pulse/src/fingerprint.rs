// ---------------------------------------------------------------------------
// Fingerprint Index — review identity and seen-set membership
// ---------------------------------------------------------------------------
//
// A review's identity is the SHA-256 of its length-prefixed normalized text
// followed by its rating. Entries are never evicted, so replaying an old batch can never
// count a review twice.
// ---------------------------------------------------------------------------

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::Review;

/// Compute the hex digest identifying `review`.
///
/// Hashed bytes: the text length as a little-endian `u64`, the text, then
/// the rating in decimal or `None` when absent. The length prefix keeps
/// digits at the end of the text from running into the rating.
pub fn fingerprint(review: &Review) -> String {
	let mut hasher = Sha256::new();
	hasher.update((review.text.len() as u64).to_le_bytes());
	hasher.update(review.text.as_bytes());
	match review.rating {
		Some(rating) => hasher.update(rating.to_string().as_bytes()),
		None => hasher.update(b"None"),
	}
	let digest = hasher.finalize();
	let mut hex = String::with_capacity(64);
	for b in digest {
		use std::fmt::Write;
		let _ = write!(hex, "{:02x}", b);
	}
	hex
}

// ---------------------------------------------------------------------------
// FingerprintIndex
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintIndex {
	seen: BTreeSet<String>,
}

impl FingerprintIndex {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn contains(&self, review: &Review) -> bool {
		self.seen.contains(&fingerprint(review))
	}

	pub fn contains_digest(&self, digest: &str) -> bool {
		self.seen.contains(digest)
	}

	/// Record a review. Returns `false` if it was already present.
	pub fn record(&mut self, review: &Review) -> bool {
		self.seen.insert(fingerprint(review))
	}

	pub fn record_digest(&mut self, digest: String) -> bool {
		self.seen.insert(digest)
	}

	pub fn record_all<'a>(&mut self, reviews: impl IntoIterator<Item = &'a Review>) {
		for review in reviews {
			self.record(review);
		}
	}

	pub fn len(&self) -> usize {
		self.seen.len()
	}

	pub fn is_empty(&self) -> bool {
		self.seen.is_empty()
	}
}
