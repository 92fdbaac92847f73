use std::collections::HashMap;
use std::path::Path;

use super::{Token, Tokenizer};
use crate::io::read_to_string;
use crate::{Error, Result};

/// Entries always known to the tokenizer: particles, a few auxiliaries and
/// punctuation.
const BUILTIN_ENTRIES: &[(&str, &[&str])] = &[
	("が", &["助詞", "格助詞"]),
	("を", &["助詞", "格助詞"]),
	("に", &["助詞", "格助詞"]),
	("へ", &["助詞", "格助詞"]),
	("で", &["助詞", "格助詞"]),
	("から", &["助詞", "格助詞"]),
	("より", &["助詞", "格助詞"]),
	("まで", &["助詞", "副助詞"]),
	("は", &["助詞", "係助詞"]),
	("も", &["助詞", "係助詞"]),
	("の", &["助詞", "連体化"]),
	("と", &["助詞", "並立助詞"]),
	("や", &["助詞", "並立助詞"]),
	("か", &["助詞", "終助詞"]),
	("ね", &["助詞", "終助詞"]),
	("よ", &["助詞", "終助詞"]),
	("です", &["助動詞"]),
	("ます", &["助動詞"]),
	("でした", &["助動詞"]),
	("ました", &["助動詞"]),
	("。", &["記号", "句点"]),
	("、", &["記号", "読点"]),
	(".", &["記号", "句点"]),
	(",", &["記号", "読点"]),
	("！", &["記号", "一般"]),
	("？", &["記号", "一般"]),
	("!", &["記号", "一般"]),
	("?", &["記号", "一般"]),
	("「", &["記号", "括弧開"]),
	("」", &["記号", "括弧閉"]),
];

/// Dictionary of known surfaces and their features.
///
/// Lookups are longest-match on characters.
#[derive(Clone, Debug, Default)]
pub struct Lexicon {
	entries: HashMap<String, Vec<String>>,
	/// Length in characters of the longest surface.
	max_chars: usize,
}

impl Lexicon {
	/// Returns a lexicon holding only the built-in entries.
	pub fn builtin() -> Self {
		let mut lexicon = Self::default();
		for (surface, features) in BUILTIN_ENTRIES {
			lexicon.insert(*surface, features.iter().copied());
		}
		lexicon
	}

	/// Adds or replaces an entry.
	pub fn insert<S, I, F>(&mut self, surface: S, features: I)
	where
		S: Into<String>,
		I: IntoIterator<Item = F>,
		F: Into<String>,
	{
		let surface = surface.into();
		self.max_chars = self.max_chars.max(surface.chars().count());
		self.entries.insert(surface, features.into_iter().map(Into::into).collect());
	}

	/// Adds every entry of `other`, replacing existing surfaces.
	pub fn extend(&mut self, other: Lexicon) {
		for (surface, features) in other.entries {
			self.insert(surface, features);
		}
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Parses a TSV lexicon.
	///
	/// Format, one entry per line: `surface<TAB>feature,feature,...`.
	/// Blank lines and lines starting with `#` are skipped.
	///
	/// # Errors
	/// Returns `Error::Lexicon` with the 1-based line number when a line
	/// has no tab, an empty surface or no feature.
	pub fn parse(text: &str) -> Result<Self> {
		let mut lexicon = Self::default();
		for (index, line) in text.lines().enumerate() {
			let line_no = index + 1;
			if line.trim().is_empty() || line.starts_with('#') {
				continue;
			}
			let Some((surface, features)) = line.split_once('\t') else {
				return Err(Error::Lexicon { line: line_no, message: "missing tab separator".to_owned() });
			};
			if surface.is_empty() {
				return Err(Error::Lexicon { line: line_no, message: "empty surface".to_owned() });
			}
			let features: Vec<&str> = features
				.split(',')
				.map(str::trim)
				.filter(|f| !f.is_empty())
				.collect();
			if features.is_empty() {
				return Err(Error::Lexicon { line: line_no, message: format!("no feature for {surface}") });
			}
			lexicon.insert(surface, features);
		}
		Ok(lexicon)
	}

	/// Loads a TSV lexicon from disk. See [`Lexicon::parse`].
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		Self::parse(&read_to_string(path)?)
	}

	/// Longest entry starting at the beginning of `chars`.
	///
	/// Returns the match length in characters and its features.
	fn longest_match(&self, chars: &[char]) -> Option<(usize, &[String])> {
		let limit = self.max_chars.min(chars.len());
		(1..=limit).rev().find_map(|len| {
			let candidate: String = chars[..len].iter().collect();
			self.entries.get(&candidate).map(|features| (len, features.as_slice()))
		})
	}
}

/// Character script used to segment text the lexicon does not cover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Script {
	Kanji,
	Hiragana,
	Katakana,
	Alphabetic,
	Numeric,
	Space,
	Symbol,
}

impl Script {
	fn of(c: char) -> Self {
		match c {
			'\u{3005}' | '\u{3400}'..='\u{4DBF}' | '\u{4E00}'..='\u{9FFF}' | '\u{F900}'..='\u{FAFF}' => Script::Kanji,
			'\u{3041}'..='\u{309F}' => Script::Hiragana,
			'\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' | '\u{FF66}'..='\u{FF9F}' => Script::Katakana,
			c if c.is_whitespace() => Script::Space,
			c if c.is_numeric() => Script::Numeric,
			c if c.is_alphabetic() => Script::Alphabetic,
			_ => Script::Symbol,
		}
	}

	/// Features assigned to an unknown run of this script.
	fn features(self) -> [&'static str; 2] {
		match self {
			Script::Kanji | Script::Hiragana => ["名詞", "一般"],
			Script::Katakana => ["名詞", "固有名詞"],
			Script::Alphabetic => ["名詞", "固有名詞"],
			Script::Numeric => ["名詞", "数"],
			Script::Space => ["記号", "空白"],
			Script::Symbol => ["記号", "一般"],
		}
	}

	/// Whether consecutive characters of this script form a single token.
	fn groups(self) -> bool {
		!matches!(self, Script::Space | Script::Symbol)
	}
}

/// Dictionary-driven tokenizer.
///
/// Segmentation is greedy:
/// - the longest lexicon entry starting at the current position wins
/// - otherwise a run of characters sharing a script becomes one token,
///   ending early where a lexicon entry starts
/// - whitespace and symbols are emitted one character at a time
///
/// Unknown runs get a class derived from their script (`名詞` for words,
/// `記号` for symbols and spaces). Accurate analysis of free text needs a
/// user lexicon covering its verbs and adjectives.
#[derive(Clone, Debug)]
pub struct LexiconTokenizer {
	lexicon: Lexicon,
}

impl Default for LexiconTokenizer {
	fn default() -> Self {
		Self::new(Lexicon::builtin())
	}
}

impl LexiconTokenizer {
	pub fn new(lexicon: Lexicon) -> Self {
		Self { lexicon }
	}

	/// Built-in entries extended (and overridden) by `user`.
	pub fn with_user_lexicon(user: Lexicon) -> Self {
		let mut lexicon = Lexicon::builtin();
		lexicon.extend(user);
		Self::new(lexicon)
	}

	pub fn lexicon(&self) -> &Lexicon {
		&self.lexicon
	}
}

impl Tokenizer for LexiconTokenizer {
	fn tokenize(&self, text: &str) -> Vec<Token> {
		let chars: Vec<char> = text.chars().collect();
		let mut tokens = vec![Token::boundary()];

		let mut i = 0;
		while i < chars.len() {
			if let Some((len, features)) = self.lexicon.longest_match(&chars[i..]) {
				let surface: String = chars[i..i + len].iter().collect();
				tokens.push(Token::word(surface, features.iter().cloned()));
				i += len;
				continue;
			}

			let script = Script::of(chars[i]);
			let mut end = i + 1;
			if script.groups() {
				while end < chars.len()
					&& Script::of(chars[end]) == script
					&& self.lexicon.longest_match(&chars[end..]).is_none()
				{
					end += 1;
				}
			}
			let surface: String = chars[i..end].iter().collect();
			tokens.push(Token::word(surface, script.features()));
			i = end;
		}

		tokens.push(Token::boundary());
		tokens
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tokenizer::{TokenKind, clean_tokens};

	fn pairs(tokens: Vec<Token>) -> Vec<(String, String)> {
		clean_tokens(tokens)
			.into_iter()
			.map(|t| {
				let class = t.class().to_owned();
				(t.surface, class)
			})
			.collect()
	}

	fn tokenizer() -> LexiconTokenizer {
		let mut user = Lexicon::default();
		user.insert("犬", ["名詞", "一般"]);
		user.insert("走る", ["動詞", "自立"]);
		LexiconTokenizer::with_user_lexicon(user)
	}

	#[test]
	fn sentence_is_bracketed_by_boundaries() {
		let tokens = tokenizer().tokenize("犬が走る。");
		assert_eq!(tokens.first().map(|t| t.kind), Some(TokenKind::Boundary));
		assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Boundary));
		assert_eq!(tokens.len(), 6);
	}

	#[test]
	fn lexicon_entries_drive_segmentation() {
		assert_eq!(
			pairs(tokenizer().tokenize("犬が走る。")),
			vec![
				("犬".to_owned(), "名詞".to_owned()),
				("が".to_owned(), "助詞".to_owned()),
				("走る".to_owned(), "動詞".to_owned()),
				("。".to_owned(), "記号".to_owned()),
			]
		);
	}

	#[test]
	fn longest_entry_wins() {
		let mut user = Lexicon::default();
		user.insert("まで", ["助詞", "副助詞"]);
		user.insert("までに", ["助詞", "格助詞"]);
		let tokens = pairs(LexiconTokenizer::with_user_lexicon(user).tokenize("までに"));
		assert_eq!(tokens, vec![("までに".to_owned(), "助詞".to_owned())]);
	}

	#[test]
	fn unknown_runs_fall_back_to_scripts() {
		let tokens = pairs(LexiconTokenizer::default().tokenize("東京タワーは333m"));
		assert_eq!(
			tokens,
			vec![
				("東京".to_owned(), "名詞".to_owned()),
				("タワー".to_owned(), "名詞".to_owned()),
				("は".to_owned(), "助詞".to_owned()),
				("333".to_owned(), "名詞".to_owned()),
				("m".to_owned(), "名詞".to_owned()),
			]
		);
	}

	#[test]
	fn spaces_become_single_tokens() {
		let tokens = LexiconTokenizer::default().tokenize("a  b.");
		let surfaces: Vec<&str> = tokens.iter().map(|t| t.surface.as_str()).collect();
		assert_eq!(surfaces, vec!["", "a", " ", " ", "b", ".", ""]);
		assert_eq!(pairs(tokens).len(), 3);
	}

	#[test]
	fn empty_text_yields_only_boundaries() {
		let tokens = LexiconTokenizer::default().tokenize("");
		assert_eq!(tokens.len(), 2);
		assert!(clean_tokens(tokens).is_empty());
	}

	#[test]
	fn parses_tsv_lexicon() {
		let lexicon = Lexicon::parse("# comment\n\n猫\t名詞,一般\n鳴く\t動詞, 自立\n").unwrap();
		assert_eq!(lexicon.len(), 2);
		let tokens = pairs(LexiconTokenizer::with_user_lexicon(lexicon).tokenize("猫が鳴く"));
		assert_eq!(tokens[2], ("鳴く".to_owned(), "動詞".to_owned()));
	}

	#[test]
	fn malformed_lexicon_reports_line() {
		let err = Lexicon::parse("猫\t名詞\n鳴く 動詞\n").unwrap_err();
		assert!(matches!(err, Error::Lexicon { line: 2, .. }));

		let err = Lexicon::parse("猫\t , \n").unwrap_err();
		assert!(matches!(err, Error::Lexicon { line: 1, .. }));
	}
}
