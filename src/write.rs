use std::{
	fs::File,
	io::{self, BufWriter, Read, Write},
	path::Path,
};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::{error::WriteError, read::Record, sectors_for, MAX_BLOB_SIZE, SECTOR_SIZE};

/// Represents a writer of indices to a `CDDATA.LOC` destination.
#[derive(Debug)]
pub struct IndexWriter<'a, L> {
	loc: &'a mut L,
}

/// Represents a writer of sector-aligned entries to a `CDDATA.000` destination.
///
/// Records are accumulated as entries are written and handed back by [`ArchiveWriter::finish`].
#[derive(Debug)]
pub struct ArchiveWriter<'a, B> {
	blob: &'a mut B,

	records: Vec<Record>,
	pos: u64,
}

impl<'a, L> IndexWriter<'a, L>
where
	L: Write,
{
	/// Creates a new index writer with the specified `loc` destination.
	pub fn new(loc: &'a mut L) -> Self {
		Self {
			loc,
		}
	}

	/// Attempts to write the header followed by each of the `records`, in order.
	pub fn write(self, records: &[Record]) -> Result<(), WriteError> {
		let count = u32::try_from(records.len()).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many records"))?;

		self.loc.write_u32::<LittleEndian>(count)?;

		for record in records {
			self.loc.write_u32::<LittleEndian>(record.position)?;
			self.loc.write_u32::<LittleEndian>(record.size)?;
			self.loc.write_u32::<LittleEndian>(record.sectors)?;
			self.loc.write_u32::<LittleEndian>(record.flag)?;
		}

		self.loc.flush()?;

		Ok(())
	}
}

/// Attempts to write the `records` as an index to the file at the specified path, replacing it if it exists.
pub fn write_index<P>(path: P, records: &[Record]) -> Result<(), WriteError>
where
	P: AsRef<Path>,
{
	let mut loc = BufWriter::new(File::create(path)?);

	IndexWriter::new(&mut loc).write(records)
}

impl<'a, B> ArchiveWriter<'a, B>
where
	B: Write,
{
	/// Creates a new archive writer with the specified `blob` destination, starting at the first sector.
	pub fn new(blob: &'a mut B) -> Self {
		Self {
			blob,
			records: Vec::new(),
			pos: 0,
		}
	}

	/// Returns the records of the entries written so far.
	pub fn records(&self) -> &[Record] {
		&self.records
	}

	/// Attempts to write a single entry from `src` at the current sector, tagged with `flag`.
	///
	/// The entry is followed by zeroes up to the next sector boundary.
	pub fn write<T>(&mut self, flag: u32, src: &mut T) -> Result<Record, WriteError>
	where
		T: Read,
	{
		// Copy the source to the current sector, refusing to go beyond the addressable range.

		let limit = MAX_BLOB_SIZE - self.pos * SECTOR_SIZE;
		let size = io::copy(&mut src.by_ref().take(limit), self.blob)?;

		// Probe for a byte beyond the limit to tell a source of exactly `limit` bytes from a longer one.

		if size == limit && src.read(&mut [0])? > 0 {
			return Err(WriteError::SizeLimit {
				size: self.pos * SECTOR_SIZE + size + 1,
			});
		}

		let sectors = sectors_for(size);

		if (self.pos + sectors) * SECTOR_SIZE > MAX_BLOB_SIZE {
			return Err(WriteError::SizeLimit {
				size: (self.pos + sectors) * SECTOR_SIZE,
			});
		}

		// Pad the entry to the sector boundary.

		let padding = sectors * SECTOR_SIZE - size;

		io::copy(&mut io::repeat(0).take(padding), self.blob)?;

		let record = Record {
			position: self.pos as u32,
			size: size as u32,
			sectors: sectors as u32,
			flag,
		};

		self.records.push(record);
		self.pos += sectors;

		Ok(record)
	}

	/// Flushes the blob and writes the index of every entry to `loc`, consuming `self` in the process.
	pub fn finish<L>(self, loc: &mut L) -> Result<Vec<Record>, WriteError>
	where
		L: Write,
	{
		self.blob.flush()?;

		IndexWriter::new(loc).write(&self.records)?;

		Ok(self.records)
	}
}
