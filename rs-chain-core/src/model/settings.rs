use std::collections::BTreeSet;

use crate::{Error, Result};

/// Words ending a generation when no terminal words are configured.
pub const DEFAULT_TERMINAL_WORDS: [&str; 2] = ["。", "."];

/// Class used by `generate` when the caller gives none (common noun).
pub const DEFAULT_CLASS: &str = "名詞";

/// Generation parameters fixed at generator construction.
///
/// # Responsibilities
/// - Hold the terminal-word set that ends a walk
/// - Hold the default class of trigger words
/// - Hold the optional step bound of a walk
///
/// # Invariants
/// - `default_class` is never empty
/// - `max_steps`, when set, is strictly positive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorSettings {
	/// Surfaces ending a walk, matched exactly regardless of class.
	terminal_words: BTreeSet<String>,

	/// Class combined with the trigger by `generate`.
	default_class: String,

	/// Maximum number of words appended by a walk.
	///
	/// `None` leaves the walk unbounded: a cycle of positive transitions
	/// that never reaches a terminal word can then run forever.
	max_steps: Option<usize>,
}

impl Default for GeneratorSettings {
	fn default() -> Self {
		Self::with_terminal_words(DEFAULT_TERMINAL_WORDS)
	}
}

impl GeneratorSettings {
	/// Creates settings with a custom terminal-word set.
	pub fn with_terminal_words<I, S>(words: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			terminal_words: words.into_iter().map(Into::into).collect(),
			default_class: DEFAULT_CLASS.to_owned(),
			max_steps: None,
		}
	}

	/// Whether `word` ends a walk.
	pub fn is_terminal(&self, word: &str) -> bool {
		self.terminal_words.contains(word)
	}

	/// Returns an iterator over the terminal words, in ascending order.
	pub fn terminal_words(&self) -> impl Iterator<Item = &str> {
		self.terminal_words.iter().map(String::as_str)
	}

	pub fn default_class(&self) -> &str {
		&self.default_class
	}

	pub fn max_steps(&self) -> Option<usize> {
		self.max_steps
	}

	/// Sets the class used when the caller does not give one.
	///
	/// # Errors
	/// Returns an error if `class` is empty.
	pub fn set_default_class(&mut self, class: &str) -> Result<()> {
		if class.is_empty() {
			return Err(Error::InvalidSetting("default class cannot be empty".to_owned()));
		}
		self.default_class = class.to_owned();
		Ok(())
	}

	/// Bounds (or unbounds, with `None`) the number of words of a walk.
	///
	/// # Errors
	/// Returns an error for `Some(0)`.
	pub fn set_max_steps(&mut self, max_steps: Option<usize>) -> Result<()> {
		if max_steps == Some(0) {
			return Err(Error::InvalidSetting("max steps must be greater than 0".to_owned()));
		}
		self.max_steps = max_steps;
		Ok(())
	}
}
