use std::{io, path::PathBuf};

use thiserror::Error;

/// Represents a read-related error.
#[derive(Debug, Error)]
pub enum ReadError {
	/// Indicates that a generic I/O error occurred.
	#[error("input/output error [{0}]")]
	IoError(#[from] io::Error),

	/// Indicates that the length of the index does not match the number of entries it declares.
	#[error("invalid length (expected {expected} bytes for {count} entries, found {actual} bytes)")]
	InvalidLength {
		count: u32,
		expected: u64,
		actual: u64,
	},

	/// Indicates that an entry extends beyond the end of the blob.
	#[error("entry {index} ends at byte {end}, beyond the blob length of {len} bytes")]
	OutOfBounds {
		index: usize,
		end: u64,
		len: u64,
	},
}

/// Represents a write-related error.
#[derive(Debug, Error)]
pub enum WriteError {
	/// Indicates that a generic I/O error occurred.
	#[error("input/output error [{0}]")]
	IoError(#[from] io::Error),

	/// Indicates that the blob would grow beyond what its 32-bit offsets can address.
	#[error("blob would grow to {size} bytes, beyond the size limit")]
	SizeLimit {
		size: u64,
	},
}

/// Represents a path table error.
#[derive(Debug, Error)]
pub enum TableError {
	/// Indicates that a generic I/O error occurred.
	#[error("input/output error [{0}]")]
	IoError(#[from] io::Error),

	/// Indicates that a path was absolute or escaped the data directory.
	#[error("invalid path <{path}> on line {line}")]
	InvalidPath {
		line: usize,
		path: String,
	},

	/// Indicates that the table holds fewer paths than requested.
	#[error("table holds {len} paths but {count} were requested")]
	TooShort {
		count: u32,
		len: usize,
	},
}

/// Represents an error raised while unpacking or repacking an archive.
#[derive(Debug, Error)]
pub enum Error {
	/// Indicates that a required archive file is absent.
	#[error("can't find \"{name}\" in \"{}\"", .dir.display())]
	MissingFile {
		name: String,
		dir: PathBuf,
	},

	/// Indicates that a required directory is absent.
	#[error("can't find \"{name}\" directory in \"{}\"", .dir.display())]
	MissingDirectory {
		name: String,
		dir: PathBuf,
	},

	/// Indicates that a file predicted by the path table is absent.
	#[error("can't find expected file \"{}\"", .0.display())]
	MissingEntry(PathBuf),

	/// Indicates that the index could not be read or is inconsistent.
	#[error("\"CDDATA.LOC\" is invalid: {0}")]
	Read(#[from] ReadError),

	/// Indicates that the archive could not be written.
	#[error("\"CDDATA.000\" could not be written: {0}")]
	Write(#[from] WriteError),

	/// Indicates that the path table could not produce the paths.
	#[error("path table error: {0}")]
	Table(#[from] TableError),

	/// Indicates that the staged files exceed what the archive can address.
	#[error("\"CDDATA.000\" can't be repacked because files exceed the size limit ({size} bytes)")]
	SizeLimit {
		size: u64,
	},

	/// Indicates that the path table produced a different number of paths than requested.
	#[error("path table produced {actual} paths for {expected} entries")]
	TableMismatch {
		expected: usize,
		actual: usize,
	},

	/// Indicates that a staged file changed length while being repacked.
	#[error("\"{}\" changed while being repacked", .0.display())]
	Changed(PathBuf),

	/// Indicates that a generic I/O error occurred on a particular path.
	#[error("input/output error on \"{}\" [{source}]", .path.display())]
	Io {
		path: PathBuf,
		source: io::Error,
	},
}

impl Error {
	/// Returns a closure wrapping an I/O error with the path it occurred on.
	pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
		let path = path.into();

		move |source| Self::Io {
			path,
			source,
		}
	}

	/// Returns if the error indicates a missing input.
	pub fn is_missing(&self) -> bool {
		matches!(self, Self::MissingFile { .. } | Self::MissingDirectory { .. } | Self::MissingEntry(_))
	}
}
