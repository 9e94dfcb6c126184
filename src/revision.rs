use std::{fmt, path::Path, str::FromStr};

use crate::{BLOB_NAME, BLOB_NAME_LOWERCASE};

/// Represents the revision of the archive format being targeted.
///
/// Revisions share the same record layout but disagree on the meaning of the trailing field,
/// on the names accepted for the blob, and on how the files to repack are discovered.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Default)]
pub enum Revision {
	/// Marks entries with a `bin` extension in the trailing field; only accepts the uppercase blob name.
	Legacy,

	/// Leaves the trailing field zeroed; also accepts the lowercase blob name as input.
	#[default]
	Current,
}

/// Represents how the number of entries to repack is determined.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Discovery {
	/// Counts the regular files present in the data directory.
	Count,

	/// Takes the count expected by the path table, counting files only when it has none.
	Table,
}

impl Revision {
	/// Returns the trailing field of the record for the entry stored at `path`.
	pub fn flag(&self, path: &Path) -> u32 {
		match self {
			Self::Legacy => u32::from(path.extension().is_some_and(|ext| ext == "bin")),
			Self::Current => 0,
		}
	}

	/// Returns the names accepted for the blob when reading, in order of preference.
	pub fn blob_names(&self) -> &'static [&'static str] {
		match self {
			Self::Legacy => &[BLOB_NAME],
			Self::Current => &[BLOB_NAME, BLOB_NAME_LOWERCASE],
		}
	}

	/// Returns how the entries to repack are discovered.
	pub fn discovery(&self) -> Discovery {
		match self {
			Self::Legacy => Discovery::Count,
			Self::Current => Discovery::Table,
		}
	}
}

impl fmt::Display for Revision {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Legacy => write!(f, "legacy"),
			Self::Current => write!(f, "current"),
		}
	}
}

impl FromStr for Revision {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"legacy" => Ok(Self::Legacy),
			"current" => Ok(Self::Current),
			_ => Err(format!("unknown revision <{}>", s)),
		}
	}
}
