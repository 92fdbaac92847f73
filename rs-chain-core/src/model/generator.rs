use std::io::Write;
use std::path::Path;

use log::{debug, info, trace};
use rand::Rng;

use super::settings::GeneratorSettings;
use super::transition_table::TransitionTable;
use super::word_link::{WordLink, identity_key};
use crate::store::{
	BUCKET_TEXTS, BUCKET_WORDS, Backend, MemoryBackend, ReadTx, SqliteBackend, WriteTx, btoi, itob,
};
use crate::tokenizer::{LexiconTokenizer, Tokenizer, clean_tokens};
use crate::{Error, Result};

/// Public contract of a word-chain generator.
///
/// Every operation except `open` fails with `Error::StoreNotOpen` when no
/// store is open.
pub trait Generator {
	/// Opens (or creates) the store at `path`.
	fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()>;

	/// Closes the store.
	fn close(&mut self) -> Result<()>;

	/// Learns the transitions of `text` and appends it to the text log.
	fn register(&mut self, text: &str) -> Result<()>;

	/// Generates a text starting from `trigger` with the default class.
	fn generate<R: Rng>(&self, trigger: &str, rng: &mut R) -> Result<String>;

	/// Generates a text starting from the `(trigger, class)` node.
	fn generate_with_class<R: Rng>(&self, trigger: &str, class: &str, rng: &mut R) -> Result<String>;

	/// Writes every transition record to `sink`, in ascending key order.
	fn dump<W: Write>(&self, sink: &mut W) -> Result<()>;

	/// Visits the text log in registration order.
	fn texts(&self, visit: &mut dyn FnMut(u64, &str) -> Result<()>) -> Result<()>;
}

/// Generator storing its word chain in a transactional `Backend`.
///
/// # Responsibilities
/// - Tokenize registered texts and fold their transitions into the store
/// - Walk the stored chain with weighted random choices
/// - Render the stored chain for inspection
///
/// # Notes
/// - `register` runs in one read-write transaction: the text log entry
///   and every record update commit together or not at all.
/// - `generate` and `dump` each run in one read-only transaction.
pub struct ChainGenerator<B: Backend, T: Tokenizer> {
	tokenizer: T,
	backend: Option<B>,
	settings: GeneratorSettings,
}

/// Production generator: SQLite store and lexicon tokenizer.
pub type SqliteGenerator = ChainGenerator<SqliteBackend, LexiconTokenizer>;

/// In-memory generator, mainly for tests.
pub type MemoryGenerator = ChainGenerator<MemoryBackend, LexiconTokenizer>;

impl<B: Backend> ChainGenerator<B, LexiconTokenizer> {
	/// Creates a closed generator with the built-in lexicon and default settings.
	pub fn new() -> Self {
		Self::with_tokenizer(LexiconTokenizer::default(), GeneratorSettings::default())
	}
}

impl<B: Backend> Default for ChainGenerator<B, LexiconTokenizer> {
	fn default() -> Self {
		Self::new()
	}
}

impl<B: Backend, T: Tokenizer> ChainGenerator<B, T> {
	/// Creates a closed generator.
	pub fn with_tokenizer(tokenizer: T, settings: GeneratorSettings) -> Self {
		Self {
			tokenizer,
			backend: None,
			settings,
		}
	}

	pub fn settings(&self) -> &GeneratorSettings {
		&self.settings
	}

	pub fn is_open(&self) -> bool {
		self.backend.is_some()
	}

	fn backend(&self) -> Result<&B> {
		self.backend.as_ref().ok_or(Error::StoreNotOpen)
	}
}

/// Folds `scratch` into the record persisted under the same key.
///
/// An absent record starts empty with the scratch record's features; a
/// persisted record keeps its own.
fn merge_into_store(tx: &mut dyn WriteTx, scratch: &WordLink) -> Result<()> {
	let key = scratch.key();

	let mut merged = match tx.get(BUCKET_WORDS, key.as_bytes())? {
		Some(bytes) => WordLink::decode(key.as_bytes(), &bytes)?,
		None => WordLink::new(scratch.word(), scratch.features().to_vec()),
	};
	merged.merge(scratch)?;

	tx.put(BUCKET_WORDS, key.as_bytes(), &merged.encode()?)
		.map_err(|source| Error::WordWrite {
			word: scratch.word().to_owned(),
			source: Box::new(source),
		})
}

impl<B: Backend, T: Tokenizer> Generator for ChainGenerator<B, T> {
	/// Opens the store and creates the `texts` and `words` buckets.
	///
	/// An already open store is closed first.
	fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
		if let Some(previous) = self.backend.take() {
			previous.close()?;
		}
		self.backend = Some(B::open(path.as_ref(), &[BUCKET_WORDS, BUCKET_TEXTS])?);
		Ok(())
	}

	fn close(&mut self) -> Result<()> {
		let backend = self.backend.take().ok_or(Error::StoreNotOpen)?;
		backend.close()?;
		info!("closed database");
		Ok(())
	}

	/// Registers one text.
	///
	/// # Behavior
	/// - Tokenizes the text and drops boundary and space tokens.
	/// - With fewer than two tokens left, returns `Ok` without touching
	///   the store: no record and no text log entry.
	/// - Otherwise, in one transaction: appends the raw text under the
	///   next `texts` sequence number, then merges every record of the
	///   text's `TransitionTable` into `words`.
	///
	/// # Errors
	/// - `StoreNotOpen` before any work.
	/// - `RecordDecode` if a persisted record is corrupt; it is left as is.
	/// - Any store failure. In every case nothing is committed.
	fn register(&mut self, text: &str) -> Result<()> {
		let backend = self.backend.as_mut().ok_or(Error::StoreNotOpen)?;

		let tokens = clean_tokens(self.tokenizer.tokenize(text));
		if tokens.len() < 2 {
			debug!("skipped text with {} usable token(s)", tokens.len());
			return Ok(());
		}

		let table = TransitionTable::from_tokens(&tokens);
		let id = backend.read_write(|tx| {
			let id = tx.next_sequence(BUCKET_TEXTS)?;
			tx.put(BUCKET_TEXTS, &itob(id), text.as_bytes())?;

			for scratch in table.records() {
				merge_into_store(tx, scratch)?;
			}
			Ok(id)
		})?;

		debug!("registered text #{id} ({} tokens, {} records)", tokens.len(), table.len());
		Ok(())
	}

	fn generate<R: Rng>(&self, trigger: &str, rng: &mut R) -> Result<String> {
		self.generate_with_class(trigger, self.settings.default_class(), rng)
	}

	/// Walks the chain from `(trigger, class)`.
	///
	/// # Behavior
	/// - An empty trigger returns an empty string without touching the store.
	/// - At each step the current record's word is appended; the walk
	///   stops on an unknown key, on a terminal word, or when no
	///   transition has a positive count.
	/// - The next key is drawn with probability proportional to counts.
	/// - Words are concatenated without separators.
	///
	/// # Notes
	/// Without `max_steps` the walk has no bound of its own: a cycle of
	/// positive transitions never reaching a terminal word loops until a
	/// random draw leaves it, which may never happen.
	fn generate_with_class<R: Rng>(&self, trigger: &str, class: &str, rng: &mut R) -> Result<String> {
		if trigger.is_empty() {
			return Ok(String::new());
		}

		let settings = &self.settings;
		self.backend()?.read_only(|tx| {
			let mut output = String::new();
			let mut key = identity_key(trigger, class);
			let mut steps = 0;

			loop {
				if settings.max_steps().is_some_and(|max| steps >= max) {
					debug!("walk stopped after {steps} steps");
					break;
				}

				let Some(bytes) = tx.get(BUCKET_WORDS, key.as_bytes())? else {
					trace!("dead end at [{key}]");
					break;
				};
				let link = WordLink::decode(key.as_bytes(), &bytes)?;

				output.push_str(link.word());
				steps += 1;

				if settings.is_terminal(link.word()) {
					break;
				}

				match link.next(rng) {
					Some(next) => {
						trace!("[{key}] -> [{next}]");
						key = next.to_owned();
					}
					None => break,
				}
			}

			Ok(output)
		})
	}

	/// Dumps the chain.
	///
	/// Format, per record in ascending key order:
	/// ```text
	/// 犬_名詞
	///   が_助詞 : 2
	///
	/// ```
	///
	/// # Errors
	/// A record that cannot be decoded aborts the dump with its key. Lines
	/// already written stay written.
	fn dump<W: Write>(&self, sink: &mut W) -> Result<()> {
		self.backend()?.read_only(|tx| {
			tx.for_each_ordered(BUCKET_WORDS, &mut |key, value| {
				let link = WordLink::decode(key, value)?;
				writeln!(sink, "{}", link.key()).map_err(Error::Sink)?;
				for (destination, count) in link.links() {
					writeln!(sink, "  {destination} : {count}").map_err(Error::Sink)?;
				}
				writeln!(sink).map_err(Error::Sink)
			})
		})
	}

	/// Visits `(sequence, text)` pairs of the text log in ascending order.
	fn texts(&self, visit: &mut dyn FnMut(u64, &str) -> Result<()>) -> Result<()> {
		self.backend()?.read_only(|tx| {
			tx.for_each_ordered(BUCKET_TEXTS, &mut |key, value| {
				let id = btoi(key).ok_or_else(|| Error::decode(key, "text log key is not 8 bytes long"))?;
				let text = std::str::from_utf8(value).map_err(|e| Error::decode(key, e))?;
				visit(id, text)
			})
		})
	}
}
