use std::{
	fs::File,
	io::{BufRead, BufReader},
	path::{Component, Path, PathBuf},
};

use crate::error::TableError;

/// Represents a source of the relative paths of entries, ordered as their records are.
///
/// The index stores no names, so the table alone decides where each entry lands within the data directory.
pub trait PathTable {
	/// Returns the ordered paths, relative to the data directory, for an archive of `count` entries.
	fn paths(&self, count: u32) -> Result<Vec<PathBuf>, TableError>;

	/// Returns the number of entries the table expects, if it describes a fixed set of files.
	fn expected_count(&self) -> Option<u32> {
		None
	}
}

/// Represents a table read from a manifest, with one relative path per line.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Manifest {
	paths: Vec<PathBuf>,
}

/// Represents a table naming every entry after its position, such as `00042.bin`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Numbered {
	extension: String,
}

impl Manifest {
	/// Attempts to read a manifest from the file at the specified path.
	pub fn open<P>(path: P) -> Result<Self, TableError>
	where
		P: AsRef<Path>,
	{
		Self::from_reader(BufReader::new(File::open(path)?))
	}

	/// Attempts to read a manifest from the specified source, skipping blank lines.
	pub fn from_reader<R>(src: R) -> Result<Self, TableError>
	where
		R: BufRead,
	{
		let mut paths = Vec::new();

		for (index, line) in src.lines().enumerate() {
			let line = line?;
			let trimmed = line.trim();

			if trimmed.is_empty() {
				continue;
			}

			let path = PathBuf::from(trimmed);

			// Every path must stay within the data directory.

			if !path.components().all(|component| matches!(component, Component::Normal(_) | Component::CurDir)) {
				return Err(TableError::InvalidPath {
					line: index + 1,
					path: trimmed.to_owned(),
				});
			}

			paths.push(path);
		}

		Ok(Self {
			paths,
		})
	}

	/// Returns the number of paths in the manifest.
	pub fn len(&self) -> usize {
		self.paths.len()
	}

	/// Returns if the manifest is void of any paths.
	pub fn is_empty(&self) -> bool {
		self.paths.is_empty()
	}
}

impl PathTable for Manifest {
	fn paths(&self, count: u32) -> Result<Vec<PathBuf>, TableError> {
		match self.paths.get(..count as usize) {
			Some(paths) => Ok(paths.to_vec()),
			None => Err(TableError::TooShort {
				count,
				len: self.paths.len(),
			}),
		}
	}

	fn expected_count(&self) -> Option<u32> {
		u32::try_from(self.paths.len()).ok()
	}
}

impl Numbered {
	/// Creates a new numbered table whose names end in the specified extension.
	pub fn new(extension: &str) -> Self {
		Self {
			extension: extension.trim_start_matches('.').to_owned(),
		}
	}
}

impl Default for Numbered {
	fn default() -> Self {
		Self::new("bin")
	}
}

impl PathTable for Numbered {
	fn paths(&self, count: u32) -> Result<Vec<PathBuf>, TableError> {
		Ok((0..count)
			.map(|index| match self.extension.is_empty() {
				true => PathBuf::from(format!("{:05}", index)),
				false => PathBuf::from(format!("{:05}.{}", index, self.extension)),
			})
			.collect())
	}
}
