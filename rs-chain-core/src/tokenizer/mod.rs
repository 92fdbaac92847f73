//! Tokenizer boundary.
//!
//! The model only needs a surface form and an ordered list of grammatical
//! features per token, the first feature being the primary class. Any
//! morphological analyzer can be plugged in through the `Tokenizer` trait.

mod lexicon;

pub use lexicon::{Lexicon, LexiconTokenizer};

/// Feature carried by boundary sentinels.
pub const BOUNDARY_FEATURE: &str = "BOS/EOS";

/// Distinguishes sentence boundary sentinels from ordinary tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
	Boundary,
	Word,
}

/// A token produced by a `Tokenizer`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
	pub kind: TokenKind,
	pub surface: String,
	/// Ordered grammatical features, the first one is the primary class.
	pub features: Vec<String>,
}

impl Token {
	/// Creates an ordinary token.
	pub fn word<S, I, F>(surface: S, features: I) -> Self
	where
		S: Into<String>,
		I: IntoIterator<Item = F>,
		F: Into<String>,
	{
		Self {
			kind: TokenKind::Word,
			surface: surface.into(),
			features: features.into_iter().map(Into::into).collect(),
		}
	}

	/// Creates a boundary sentinel.
	pub fn boundary() -> Self {
		Self {
			kind: TokenKind::Boundary,
			surface: String::new(),
			features: vec![BOUNDARY_FEATURE.to_owned()],
		}
	}

	/// Primary grammatical class, empty if the token carries no feature.
	pub fn class(&self) -> &str {
		self.features.first().map(String::as_str).unwrap_or_default()
	}

	/// Whether the token takes part in the transition graph.
	///
	/// Boundary sentinels and single-space tokens are dropped.
	pub fn is_usable(&self) -> bool {
		self.kind != TokenKind::Boundary && self.surface != " "
	}
}

/// Splits raw text into tokens.
///
/// Implementations return the tokens in text order, bracketed by boundary
/// sentinels. Whitespace may appear as its own tokens.
pub trait Tokenizer {
	fn tokenize(&self, text: &str) -> Vec<Token>;
}

impl<F> Tokenizer for F
where
	F: Fn(&str) -> Vec<Token>,
{
	fn tokenize(&self, text: &str) -> Vec<Token> {
		self(text)
	}
}

/// Removes boundary sentinels and single-space tokens.
pub fn clean_tokens(tokens: Vec<Token>) -> Vec<Token> {
	tokens.into_iter().filter(Token::is_usable).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cleaning_drops_sentinels_and_spaces() {
		let tokens = vec![
			Token::boundary(),
			Token::word("hello", ["名詞"]),
			Token::word(" ", ["記号", "空白"]),
			Token::word("world", ["名詞"]),
			Token::word("\t", ["記号", "空白"]),
			Token::boundary(),
		];
		let surfaces: Vec<String> = clean_tokens(tokens).into_iter().map(|t| t.surface).collect();
		// Only the exact single space is filtered.
		assert_eq!(surfaces, vec!["hello", "world", "\t"]);
	}

	#[test]
	fn closures_are_tokenizers() {
		let fixed = |_: &str| vec![Token::boundary(), Token::word("犬", ["名詞"]), Token::boundary()];
		assert_eq!(fixed.tokenize("whatever").len(), 3);
		assert_eq!(Token::word("犬", ["名詞", "一般"]).class(), "名詞");
	}
}
