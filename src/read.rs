use std::{
	fs::File,
	io::{self, BufReader, Read, Seek},
	path::Path,
};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::{error::ReadError, HEADER_SIZE, RECORD_SIZE, SECTOR_SIZE};

/// Represents a single record of the index, describing where an entry lives within the blob.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Default)]
pub struct Record {
	/// The offset, in sectors, of the entry.
	pub position: u32,

	/// The length, in bytes, of the entry (excluding padding).
	pub size: u32,

	/// The length, in sectors, of the entry.
	pub sectors: u32,

	/// The trailing field of the record, whose meaning depends on the revision.
	pub flag: u32,
}

/// Represents the fully read index of an archive.
#[derive(Debug, Clone, Default, Hash, Eq, PartialEq)]
pub struct Index {
	records: Vec<Record>,
}

/// Represents an archive, pairing an index with the blob it describes.
#[derive(Debug)]
pub struct Archive<'a, R> {
	inner: &'a mut R,

	index: Index,
}

/// Represents an entry opened for reading.
#[derive(Debug)]
pub struct OpenEntry<'a, R>
where
	R: Read + Seek,
{
	inner: &'a mut R,

	off: u64,
	len: u64,
	pos: u64,
}

/// Represents a reader of indices from a `CDDATA.LOC` source.
#[derive(Debug)]
pub struct IndexReader<'a, L>
where
	L: Read + Seek,
{
	loc: &'a mut L,
}

impl Record {
	/// Returns the offset, in bytes, of the entry within the blob.
	pub fn offset(&self) -> u64 {
		self.position as u64 * SECTOR_SIZE
	}

	/// Returns the offset, in bytes, one past the last byte of the entry within the blob.
	pub fn end(&self) -> u64 {
		self.offset() + self.size as u64
	}
}

impl<'a, L> IndexReader<'a, L>
where
	L: Read + Seek,
{
	/// Creates a new index reader with the specified `loc` source.
	pub fn new(loc: &'a mut L) -> Self {
		Self {
			loc,
		}
	}

	/// Attempts to fully read the index, consuming `self` in the process.
	pub fn read(self) -> Result<Index, ReadError> {
		// Determine the total length of the source.

		let actual = self.loc.seek(io::SeekFrom::End(0))?;

		self.loc.seek(io::SeekFrom::Start(0))?;

		if actual < HEADER_SIZE {
			return Err(ReadError::InvalidLength {
				count: 0,
				expected: HEADER_SIZE,
				actual,
			});
		}

		// Read the (expected) number of entries and check it against the length of the source.

		let count = self.loc.read_u32::<LittleEndian>()?;
		let expected = HEADER_SIZE + count as u64 * RECORD_SIZE;

		if actual != expected {
			return Err(ReadError::InvalidLength {
				count,
				expected,
				actual,
			});
		}

		let mut records: Vec<Record> = Vec::with_capacity(count as usize);

		for _ in 0..count {
			// Read the properties of the entry.

			let position = self.loc.read_u32::<LittleEndian>()?;
			let size = self.loc.read_u32::<LittleEndian>()?;
			let sectors = self.loc.read_u32::<LittleEndian>()?;
			let flag = self.loc.read_u32::<LittleEndian>()?;

			records.push(Record {
				position,
				size,
				sectors,
				flag,
			});
		}

		Ok(Index {
			records,
		})
	}
}

/// Attempts to read the index stored in the file at the specified path.
pub fn read_index<P>(path: P) -> Result<Index, ReadError>
where
	P: AsRef<Path>,
{
	let mut loc = BufReader::new(File::open(path)?);

	IndexReader::new(&mut loc).read()
}

impl Index {
	/// Creates an index from the specified records.
	pub fn new(records: Vec<Record>) -> Self {
		Self {
			records,
		}
	}

	/// Returns the number of entries in the index.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Returns if the index is void of any entries.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Returns the record at the specified index, if it exists.
	pub fn get(&self, index: usize) -> Option<&Record> {
		self.records.get(index)
	}

	/// Returns an iterator over each of the records in the index.
	pub fn iter(&self) -> impl Iterator<Item = &Record> {
		self.records.iter()
	}

	/// Returns the records of the index as a slice.
	pub fn records(&self) -> &[Record] {
		&self.records
	}

	/// Checks that every entry lies within a blob of `len` bytes.
	pub fn check_bounds(&self, len: u64) -> Result<(), ReadError> {
		match self.records.iter().enumerate().find(|(_, record)| record.end() > len) {
			Some((index, record)) => Err(ReadError::OutOfBounds {
				index,
				end: record.end(),
				len,
			}),
			None => Ok(()),
		}
	}
}

impl<'a, I> Archive<'a, I> {
	/// Creates an archive from a previously read `index` and the `blob` it describes.
	pub fn new(index: Index, blob: &'a mut I) -> Self {
		Self {
			inner: blob,
			index,
		}
	}

	/// Returns the index of the archive.
	pub fn index(&self) -> &Index {
		&self.index
	}

	/// Returns the number of entries in the archive.
	pub fn len(&self) -> usize {
		self.index.len()
	}

	/// Returns if the archive is void of any entries.
	pub fn is_empty(&self) -> bool {
		self.index.is_empty()
	}
}

impl<'a, I> Archive<'a, I>
where
	I: Read + Seek,
{
	/// Opens and returns the entry at the specified index for reading, if it exists.
	pub fn open(&mut self, index: usize) -> Option<OpenEntry<I>> {
		let record = self.index.get(index)?;

		Some(OpenEntry {
			inner: self.inner,
			off: record.offset(),
			len: record.size as u64,
			pos: 0,
		})
	}
}

impl<'a, R> Read for OpenEntry<'a, R>
where
	R: Read + Seek,
{
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		// Check if we have already reached the end of the entry.

		if self.pos >= self.len {
			return Ok(0);
		}

		// Seek to the start of the entry including any currently read bytes.

		self.inner.seek(io::SeekFrom::Start(self.off + self.pos))?;

		// Forbid reading beyond the entry, honouring the number of bytes already read and the length of the buffer.

		let len = (self.len - self.pos).min(buf.len() as u64) as usize;
		let off = self.inner.read(&mut buf[0..len])?;

		self.pos += off as u64;

		Ok(off)
	}
}

#[cfg(test)]
mod tests {
	use std::io::{Cursor, Read};

	use crate::error::ReadError;

	use super::{Archive, Index, IndexReader, Record};

	#[rustfmt::skip]
	fn loc_bytes() -> Vec<u8> {
		vec![
			2, 0, 0, 0, // Count
			0, 0, 0, 0, // Position
			5, 0, 0, 0, // Size
			1, 0, 0, 0, // Sectors
			1, 0, 0, 0, // Flag
			1, 0, 0, 0, // Position
			1, 8, 0, 0, // Size
			2, 0, 0, 0, // Sectors
			0, 0, 0, 0, // Flag
		]
	}

	fn blob_bytes() -> Vec<u8> {
		let mut blob = vec![0; 3 * 2048];

		blob[0..5].copy_from_slice(b"Kahzu");
		blob[2048..2048 + 2049].fill(b'x');

		blob
	}

	#[test]
	fn test_read_index() {
		let mut loc = Cursor::new(loc_bytes());
		let index = IndexReader::new(&mut loc).read().expect("failed to read index");

		assert_eq!(index.len(), 2);

		assert_eq!(
			index.get(0),
			Some(&Record {
				position: 0,
				size: 5,
				sectors: 1,
				flag: 1,
			})
		);

		assert_eq!(
			index.get(1),
			Some(&Record {
				position: 1,
				size: 2049,
				sectors: 2,
				flag: 0,
			})
		);
	}

	#[test]
	fn test_read_index_empty() {
		let mut loc = Cursor::new(vec![0u8, 0, 0, 0]);
		let index = IndexReader::new(&mut loc).read().expect("failed to read index");

		assert!(index.is_empty());
	}

	#[test]
	fn test_read_index_truncated() {
		let mut bytes = loc_bytes();
		bytes.pop();

		let mut loc = Cursor::new(bytes);
		let err = IndexReader::new(&mut loc).read();

		assert!(matches!(
			err,
			Err(ReadError::InvalidLength {
				count: 2,
				expected: 36,
				actual: 35,
			})
		));
	}

	#[test]
	fn test_read_index_trailing() {
		let mut bytes = loc_bytes();
		bytes.extend_from_slice(&[0; 16]);

		let mut loc = Cursor::new(bytes);

		assert!(matches!(IndexReader::new(&mut loc).read(), Err(ReadError::InvalidLength { .. })));
	}

	#[test]
	fn test_read_index_no_header() {
		let mut loc = Cursor::new(vec![1u8, 0]);

		assert!(matches!(
			IndexReader::new(&mut loc).read(),
			Err(ReadError::InvalidLength {
				actual: 2,
				..
			})
		));
	}

	#[test]
	fn test_check_bounds() {
		let mut loc = Cursor::new(loc_bytes());
		let index = IndexReader::new(&mut loc).read().expect("failed to read index");

		assert!(index.check_bounds(2048 + 2049).is_ok());

		assert!(matches!(
			index.check_bounds(4096),
			Err(ReadError::OutOfBounds {
				index: 1,
				end: 4097,
				len: 4096,
			})
		));

		assert!(Index::new(Vec::new()).check_bounds(0).is_ok());

		let unaligned = Index::new(vec![Record {
			position: 2,
			size: 1,
			sectors: 1,
			flag: 0,
		}]);

		assert!(unaligned.check_bounds(4097).is_ok());
		assert!(unaligned.check_bounds(4096).is_err());
	}

	#[test]
	fn test_read_entry() {
		let mut loc = Cursor::new(loc_bytes());
		let mut blob = Cursor::new(blob_bytes());

		let index = IndexReader::new(&mut loc).read().expect("failed to read index");
		let mut archive = Archive::new(index.clone(), &mut blob);

		assert_eq!(archive.len(), 2);
		assert!(!archive.is_empty());
		assert_eq!(archive.index(), &index);

		let mut buf = Vec::new();
		let len = archive.open(0).expect("expected first entry").read_to_end(&mut buf).expect("failed to read entry");

		assert_eq!(len, 5);
		assert_eq!(buf, b"Kahzu");

		let mut buf = Vec::new();
		let len = archive.open(1).expect("expected second entry").read_to_end(&mut buf).expect("failed to read entry");

		assert_eq!(len, 2049);
		assert!(buf.iter().all(|&b| b == b'x'));

		assert!(archive.open(2).is_none());
	}

	#[test]
	fn test_read_entry_partial() {
		let mut loc = Cursor::new(loc_bytes());
		let mut blob = Cursor::new(blob_bytes());

		let index = IndexReader::new(&mut loc).read().expect("failed to read index");
		let mut archive = Archive::new(index, &mut blob);
		let mut entry = archive.open(1).expect("expected second entry");

		let mut buf = [0; 1024];

		assert!(matches!(entry.read(&mut buf), Ok(1024)));
		assert!(matches!(entry.read(&mut buf), Ok(1024)));
		assert!(matches!(entry.read(&mut buf), Ok(1)));
		assert!(matches!(entry.read(&mut buf), Ok(0)));
	}
}
