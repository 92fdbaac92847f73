use std::env;
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// File name of the database when no path is configured.
pub const DEFAULT_DATABASE_NAME: &str = "rs-chain.db";

/// Reads a whole text file.
///
/// # Errors
/// Returns `Error::InputIo` naming the path.
pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
	let path = path.as_ref();
	fs::read_to_string(path).map_err(|source| Error::InputIo {
		origin: path.display().to_string(),
		source,
	})
}

/// Calls `f` for every line of `reader`, stopping at the first error.
///
/// - Splits on `\n` / `\r\n`, line terminators are not passed to `f`
/// - `origin` names the source in `Error::InputIo`
pub fn for_each_line<R, F>(reader: R, origin: &str, mut f: F) -> Result<usize>
where
	R: BufRead,
	F: FnMut(&str) -> Result<()>,
{
	let mut count = 0;
	for line in reader.lines() {
		let line = line.map_err(|source| Error::InputIo {
			origin: origin.to_owned(),
			source,
		})?;
		f(&line)?;
		count += 1;
	}
	Ok(count)
}

/// Returns the user's home directory.
///
/// - `HOME`, then `USERPROFILE`
/// - Falls back to the current directory when neither is set
pub(crate) fn home_dir() -> PathBuf {
	["HOME", "USERPROFILE"]
		.iter()
		.filter_map(|name| env::var_os(name))
		.find(|value| !value.is_empty())
		.map(PathBuf::from)
		.unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Default database location: `<home>/rs-chain.db`.
pub fn default_database_path() -> PathBuf {
	home_dir().join(DEFAULT_DATABASE_NAME)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	#[test]
	fn lines_are_visited_in_order() {
		let mut seen = Vec::new();
		let count = for_each_line(Cursor::new("one\r\ntwo\n\nthree"), "test", |line| {
			seen.push(line.to_owned());
			Ok(())
		})
		.unwrap();
		assert_eq!(count, 4);
		assert_eq!(seen, vec!["one", "two", "", "three"]);
	}

	#[test]
	fn callback_error_stops_the_scan() {
		let mut seen = 0;
		let result = for_each_line(Cursor::new("a\nb\nc"), "test", |_| {
			seen += 1;
			if seen == 2 { Err(Error::StoreNotOpen) } else { Ok(()) }
		});
		assert!(matches!(result, Err(Error::StoreNotOpen)));
		assert_eq!(seen, 2);
	}

	#[test]
	fn missing_file_names_its_path() {
		let err = read_to_string("/definitely/not/here.txt").unwrap_err();
		match err {
			Error::InputIo { origin, .. } => assert!(origin.contains("not/here.txt")),
			other => panic!("unexpected error: {other}"),
		}
	}

	#[test]
	fn default_database_lives_in_home() {
		assert!(default_database_path().ends_with(DEFAULT_DATABASE_NAME));
	}
}
