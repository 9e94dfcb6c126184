//! Library for unpacking and repacking the `CDDATA.000` archive (and supplementary `CDDATA.LOC` index) used by Jade Cocoon 2.

/// Contains types for errors.
pub mod error;

/// Contains types and the accompanying logic for reading indices and entries from archives.
pub mod read;

/// Contains the format revisions an archive may target.
pub mod revision;

/// Contains the tables mapping entries to their relative paths.
pub mod table;

/// Contains the logic for converting between archives and directory trees.
pub mod transcode;

/// Contains types and the accompanying logic for writing indices and entries to archives.
pub mod write;

pub use transcode::{inspect, repack, unpack, Options};

/// Represents the number of bytes of a sector.
pub const SECTOR_SIZE: u64 = 2048;

/// Represents the number of bytes of the index header (the entry count).
pub const HEADER_SIZE: u64 = 4;

/// Represents the number of bytes of a single index record.
pub const RECORD_SIZE: u64 = 16;

/// Represents the largest byte offset addressable within a blob.
pub const MAX_BLOB_SIZE: u64 = u32::MAX as u64;

/// Represents the name of the blob file.
pub const BLOB_NAME: &str = "CDDATA.000";

/// Represents the lowercase name of the blob file, accepted as input by some revisions.
pub const BLOB_NAME_LOWERCASE: &str = "cddata.000";

/// Represents the name of the index file.
pub const INDEX_NAME: &str = "CDDATA.LOC";

/// Represents the name of the directory holding the individual files.
pub const DATA_DIRECTORY: &str = "data";

/// Returns the number of sectors needed to hold `size` bytes.
pub fn sectors_for(size: u64) -> u64 {
	size.div_ceil(SECTOR_SIZE)
}

#[cfg(test)]
mod tests {
	use super::sectors_for;

	#[test]
	fn test_sectors_for() {
		assert_eq!(sectors_for(0), 0);
		assert_eq!(sectors_for(1), 1);
		assert_eq!(sectors_for(2048), 1);
		assert_eq!(sectors_for(2049), 2);
		assert_eq!(sectors_for(4096), 2);
	}
}
