use std::collections::BTreeMap;

use super::word_link::WordLink;
use crate::tokenizer::Token;

/// Transition counts collected from a single text.
///
/// The table is the in-memory delta built by one `register` call before it
/// is folded into the persisted model.
///
/// # Responsibilities
/// - Turn a cleaned token sequence into one record per word identity
/// - Count every adjacent pair once
/// - Share one record between all occurrences of a key, so repeated words
///   and self-loops accumulate before the merge
///
/// # Invariants
/// - Each record in `records` is stored under its own `key()`
/// - Every token of the source sequence has a record, including the last
///   one even though it has no outgoing transition
#[derive(Clone, Debug, Default)]
pub struct TransitionTable {
	records: BTreeMap<String, WordLink>,
}

impl TransitionTable {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds the table of a cleaned token sequence.
	///
	/// # Notes
	/// - Expects boundary and space tokens to be removed already.
	/// - A sequence shorter than two tokens yields an empty table.
	pub fn from_tokens(tokens: &[Token]) -> Self {
		let mut table = Self::new();
		table.add_tokens(tokens);
		table
	}

	/// Adds the transitions of a cleaned token sequence.
	///
	/// Sequences shorter than two tokens carry no transition and are ignored.
	pub fn add_tokens(&mut self, tokens: &[Token]) {
		if tokens.len() < 2 {
			return;
		}

		let mut previous: Option<String> = None;
		for token in tokens {
			let record = WordLink::from_token(token);
			let key = record.key();
			// First occurrence wins, later ones reuse the same record.
			self.records.entry(key.clone()).or_insert(record);

			if let Some(previous) = previous.as_deref() {
				if let Some(prev) = self.records.get_mut(previous) {
					prev.add_link(&key);
				}
			}
			previous = Some(key);
		}
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Record stored under `key`, if any.
	pub fn get(&self, key: &str) -> Option<&WordLink> {
		self.records.get(key)
	}

	/// Records in ascending key order.
	pub fn records(&self) -> impl Iterator<Item = &WordLink> {
		self.records.values()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tokens(pairs: &[(&str, &str)]) -> Vec<Token> {
		pairs.iter().map(|(surface, class)| Token::word(*surface, [*class])).collect()
	}

	#[test]
	fn short_sequences_are_ignored() {
		assert!(TransitionTable::from_tokens(&[]).is_empty());
		assert!(TransitionTable::from_tokens(&tokens(&[("犬", "名詞")])).is_empty());
	}

	#[test]
	fn every_adjacent_pair_is_counted() {
		let table = TransitionTable::from_tokens(&tokens(&[
			("犬", "名詞"),
			("が", "助詞"),
			("走る", "動詞"),
			("。", "記号"),
		]));

		assert_eq!(table.len(), 4);
		assert_eq!(table.get("犬_名詞").map(|r| r.count("が_助詞")), Some(1));
		assert_eq!(table.get("が_助詞").map(|r| r.count("走る_動詞")), Some(1));
		assert_eq!(table.get("走る_動詞").map(|r| r.count("。_記号")), Some(1));
		assert_eq!(table.get("。_記号").map(|r| r.links().count()), Some(0));
	}

	#[test]
	fn repeated_keys_share_one_record() {
		let table = TransitionTable::from_tokens(&tokens(&[
			("犬", "名詞"),
			("が", "助詞"),
			("犬", "名詞"),
			("が", "助詞"),
			("犬", "名詞"),
		]));

		assert_eq!(table.len(), 2);
		assert_eq!(table.get("犬_名詞").map(|r| r.count("が_助詞")), Some(2));
		assert_eq!(table.get("が_助詞").map(|r| r.count("犬_名詞")), Some(2));
	}

	#[test]
	fn self_loops_accumulate() {
		let table = TransitionTable::from_tokens(&tokens(&[("ワン", "名詞"), ("ワン", "名詞"), ("ワン", "名詞")]));
		assert_eq!(table.get("ワン_名詞").map(|r| r.count("ワン_名詞")), Some(2));
	}

	#[test]
	fn same_surface_with_other_class_is_another_node() {
		let table = TransitionTable::from_tokens(&tokens(&[("と", "助詞"), ("と", "接続詞")]));
		assert_eq!(table.len(), 2);
		assert_eq!(table.get("と_助詞").map(|r| r.count("と_接続詞")), Some(1));
	}
}
