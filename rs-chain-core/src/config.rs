use std::env;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::io::{default_database_path, read_to_string};
use crate::model::settings::GeneratorSettings;
use crate::tokenizer::{Lexicon, LexiconTokenizer};
use crate::{Error, Result};

/// Environment variable overriding the database path.
pub const DATABASE_ENV: &str = "RS_CHAIN_DB";

/// Configuration loaded from a TOML file.
///
/// Every field is optional; missing ones fall back to the library
/// defaults. Precedence, lowest first: defaults, file, `RS_CHAIN_DB`,
/// then whatever the caller applies on top (command-line flags).
///
/// ```toml
/// database = "/var/lib/rs-chain/model.db"
/// lexicon = "lexicon.tsv"
/// terminal_words = ["。", ".", "！"]
/// default_class = "名詞"
/// max_steps = 128
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	pub database: Option<PathBuf>,
	pub lexicon: Option<PathBuf>,
	pub terminal_words: Option<Vec<String>>,
	pub default_class: Option<String>,
	pub max_steps: Option<usize>,
}

impl Config {
	/// Parses a TOML document. `origin` names it in errors.
	pub fn parse(contents: &str, origin: &Path) -> Result<Self> {
		toml::from_str(contents).map_err(|e| Error::Config {
			path: origin.to_path_buf(),
			message: e.to_string(),
		})
	}

	/// Loads a TOML configuration file.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let contents = read_to_string(path).map_err(|e| Error::Config {
			path: path.to_path_buf(),
			message: e.to_string(),
		})?;
		debug!("loaded configuration {}", path.display());
		Self::parse(&contents, path)
	}

	/// Loads `path` if given, defaults otherwise, then applies the
	/// environment.
	pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
		let mut config = match path {
			Some(path) => Self::load(path)?,
			None => Self::default(),
		};
		config.apply_env();
		Ok(config)
	}

	/// Applies `RS_CHAIN_DB` when set and not empty.
	pub fn apply_env(&mut self) {
		if let Some(value) = env::var_os(DATABASE_ENV).filter(|v| !v.is_empty()) {
			self.database = Some(PathBuf::from(value));
		}
	}

	/// Database path, `<home>/rs-chain.db` when unset.
	pub fn database_path(&self) -> PathBuf {
		self.database.clone().unwrap_or_else(default_database_path)
	}

	/// Builds generator settings from this configuration.
	pub fn generator_settings(&self) -> Result<GeneratorSettings> {
		let mut settings = match &self.terminal_words {
			Some(words) => GeneratorSettings::with_terminal_words(words.iter().cloned()),
			None => GeneratorSettings::default(),
		};
		if let Some(class) = &self.default_class {
			settings.set_default_class(class)?;
		}
		settings.set_max_steps(self.max_steps)?;
		Ok(settings)
	}

	/// Builds the tokenizer: built-in lexicon plus the user lexicon, if any.
	pub fn tokenizer(&self) -> Result<LexiconTokenizer> {
		match &self.lexicon {
			Some(path) => Ok(LexiconTokenizer::with_user_lexicon(Lexicon::load(path)?)),
			None => Ok(LexiconTokenizer::default()),
		}
	}
}
