use std::collections::BTreeMap;

use rand::Rng;

use serde::{Deserialize, Serialize};

use crate::tokenizer::Token;
use crate::{Error, Result};

/// Separator between the surface and the class in a word identity key.
pub const KEY_SEPARATOR: &str = "_";

/// Builds the identity key of a (surface, primary class) pair.
///
/// Example: `("犬", "名詞")` → `"犬_名詞"`
pub fn identity_key(surface: &str, class: &str) -> String {
	format!("{surface}{KEY_SEPARATOR}{class}")
}

/// Transition record of one word identity.
///
/// A `WordLink` is a node of the word chain: it remembers the surface
/// form, the features seen when the node was first created, and how many
/// times each other node followed it.
///
/// ## Responsibilities:
/// - Accumulate transition occurrences during registration
/// - Pick the next node using weighted random sampling
/// - Merge with another record having the same key
///
/// ## Invariants
/// - `key()` depends only on `word` and the first feature
/// - Counts are never decremented
/// - `features` keeps the first-seen set, merges never replace it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WordLink {
	/// Surface form.
	word: String,
	/// Grammatical features, the first one is the primary class.
	features: Vec<String>,
	/// Outgoing transitions indexed by destination key.
	/// Example: { "が_助詞" => 2, "は_助詞" => 1 }
	links: BTreeMap<String, u64>,
}

impl WordLink {
	/// Creates a record without transitions.
	pub fn new(word: &str, features: Vec<String>) -> Self {
		Self {
			word: word.to_owned(),
			features,
			links: BTreeMap::new(),
		}
	}

	/// Creates a record from a token's surface and features.
	pub fn from_token(token: &Token) -> Self {
		Self::new(&token.surface, token.features.clone())
	}

	/// Identity key: `word ++ "_" ++ features[0]`.
	pub fn key(&self) -> String {
		identity_key(&self.word, self.features.first().map(String::as_str).unwrap_or_default())
	}

	pub fn word(&self) -> &str {
		&self.word
	}

	pub fn features(&self) -> &[String] {
		&self.features
	}

	/// Outgoing transitions in ascending destination order.
	pub fn links(&self) -> impl Iterator<Item = (&str, u64)> {
		self.links.iter().map(|(k, v)| (k.as_str(), *v))
	}

	/// Number of recorded occurrences of `self → destination`.
	pub fn count(&self, destination: &str) -> u64 {
		self.links.get(destination).copied().unwrap_or(0)
	}

	/// Records an occurrence of a transition toward `destination`.
	pub fn add_link(&mut self, destination: &str) {
		*self.links.entry(destination.to_owned()).or_insert(0) += 1;
	}

	/// Sets the count of a transition as is.
	///
	/// Used to restore records; registration only goes through `add_link`.
	pub fn set_link(&mut self, destination: &str, count: u64) {
		self.links.insert(destination.to_owned(), count);
	}

	/// Picks the next destination key.
	///
	/// The probability of a destination is proportional to its count.
	/// Zero-count transitions are excluded from the candidates.
	///
	/// Returns `None` when no transition has a positive count.
	pub fn next<R: Rng>(&self, rng: &mut R) -> Option<&str> {
		let mut candidates = self.links.iter().filter(|(_, count)| **count > 0);

		let total: u64 = candidates.clone().map(|(_, count)| count).sum();
		if total == 0 {
			return None;
		}

		let mut r = rng.random_range(0..total);
		candidates.find_map(|(destination, count)| {
			if r < *count {
				Some(destination.as_str())
			} else {
				r -= count;
				None
			}
		})
	}

	/// Merges another record into this one.
	///
	/// Both records must have the same key. Counts are summed key-wise,
	/// unknown destinations are added. `self` keeps its features.
	///
	/// # Errors
	/// Returns `Error::KeyMismatch` if the keys differ.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.key() != other.key() {
			return Err(Error::KeyMismatch {
				expected: self.key(),
				found: other.key(),
			});
		}

		for (destination, count) in &other.links {
			*self.links.entry(destination.clone()).or_insert(0) += *count;
		}

		Ok(())
	}

	/// Serializes the record to JSON bytes.
	pub fn encode(&self) -> Result<Vec<u8>> {
		serde_json::to_vec(self).map_err(|source| Error::RecordEncode {
			word: self.word.clone(),
			source,
		})
	}

	/// Parses a record stored under `key`.
	///
	/// Missing fields or malformed bytes are rejected, never defaulted.
	pub fn decode(key: &[u8], bytes: &[u8]) -> Result<Self> {
		serde_json::from_slice(bytes).map_err(|e| Error::decode(key, e))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn link(word: &str, class: &str) -> WordLink {
		WordLink::new(word, vec![class.to_owned()])
	}

	#[test]
	fn key_uses_the_primary_class_only() {
		let a = WordLink::new("犬", vec!["名詞".to_owned(), "一般".to_owned()]);
		let b = WordLink::new("犬", vec!["名詞".to_owned(), "固有名詞".to_owned()]);
		assert_eq!(a.key(), "犬_名詞");
		assert_eq!(a.key(), b.key());
	}

	#[test]
	fn merge_sums_counts_and_keeps_first_features() {
		let mut first = WordLink::new("犬", vec!["名詞".to_owned(), "一般".to_owned()]);
		first.add_link("が_助詞");

		let mut second = WordLink::new("犬", vec!["名詞".to_owned(), "固有名詞".to_owned()]);
		second.add_link("が_助詞");
		second.add_link("は_助詞");

		first.merge(&second).unwrap();
		assert_eq!(first.count("が_助詞"), 2);
		assert_eq!(first.count("は_助詞"), 1);
		assert_eq!(first.features()[1], "一般");
	}

	#[test]
	fn merge_rejects_other_keys() {
		let mut dog = link("犬", "名詞");
		let err = dog.merge(&link("猫", "名詞")).unwrap_err();
		assert!(matches!(err, Error::KeyMismatch { .. }));
	}

	#[test]
	fn next_is_proportional_to_counts() {
		let mut node = link("犬", "名詞");
		node.set_link("a", 1);
		node.set_link("b", 3);

		let mut rng = StdRng::seed_from_u64(7);
		let draws = 20_000;
		let b_hits = (0..draws).filter(|_| node.next(&mut rng) == Some("b")).count();
		let ratio = b_hits as f64 / draws as f64;
		assert!((ratio - 0.75).abs() < 0.03, "ratio was {ratio}");
	}

	#[test]
	fn zero_counts_are_never_selected() {
		let mut node = link("犬", "名詞");
		node.set_link("dead", 0);
		node.set_link("alive", 1);

		let mut rng = StdRng::seed_from_u64(1);
		for _ in 0..100 {
			assert_eq!(node.next(&mut rng), Some("alive"));
		}

		let mut only_zero = link("犬", "名詞");
		only_zero.set_link("dead", 0);
		assert_eq!(only_zero.next(&mut rng), None);
		assert_eq!(link("犬", "名詞").next(&mut rng), None);
	}

	#[test]
	fn json_layout_is_field_tagged() {
		let mut node = link("犬", "名詞");
		node.add_link("が_助詞");
		let bytes = node.encode().unwrap();
		assert_eq!(
			String::from_utf8(bytes.clone()).unwrap(),
			r#"{"word":"犬","features":["名詞"],"links":{"が_助詞":1}}"#
		);
		assert_eq!(WordLink::decode(b"k", &bytes).unwrap(), node);
	}

	#[test]
	fn decode_failures_carry_the_key() {
		let err = WordLink::decode("犬_名詞".as_bytes(), b"{not json").unwrap_err();
		match err {
			Error::RecordDecode { key, .. } => assert_eq!(key, "犬_名詞"),
			other => panic!("unexpected error: {other}"),
		}

		// Missing `links` must not silently default to an empty map.
		let partial = r#"{"word":"犬","features":["名詞"]}"#;
		let err = WordLink::decode(b"k", partial.as_bytes()).unwrap_err();
		assert!(matches!(err, Error::RecordDecode { .. }));
	}
}
