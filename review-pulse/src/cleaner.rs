// ---------------------------------------------------------------------------
// Review text normalization
// ---------------------------------------------------------------------------

use std::sync::LazyLock;

use regex::Regex;

use crate::types::Review;

static NON_ALNUM: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Lowercase, replace anything outside `[a-z0-9]` and whitespace with a
/// space, collapse whitespace and trim.
pub fn clean_text(text: &str) -> String {
	let lowered = text.to_lowercase();
	let stripped = NON_ALNUM.replace_all(&lowered, " ");
	let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
	collapsed.trim().to_string()
}

/// Normalize every review, dropping those left with no text. Ratings pass
/// through untouched and order is preserved.
pub fn clean_reviews(reviews: &[Review]) -> Vec<Review> {
	reviews
		.iter()
		.filter_map(|r| {
			let text = clean_text(&r.text);
			(!text.is_empty()).then(|| Review::new(text, r.rating))
		})
		.collect()
}
