use std::{
	fmt,
	fs::{self, File},
	io::{self, BufReader, BufWriter, Write},
	path::{Path, PathBuf},
};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
	error::{Error, ReadError},
	read::{Archive, Index, IndexReader},
	revision::{Discovery, Revision},
	sectors_for,
	table::PathTable,
	write::ArchiveWriter,
	BLOB_NAME, DATA_DIRECTORY, INDEX_NAME, MAX_BLOB_SIZE, SECTOR_SIZE,
};

/// Represents the options shared by every operation.
#[derive(Clone, Copy)]
pub struct Options<'a> {
	/// The revision of the archive format to target.
	pub revision: Revision,

	/// The table naming each entry.
	pub table: &'a dyn PathTable,
}

/// Represents the outcome of a successful unpack.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Unpacked {
	/// The number of files written.
	pub entries: usize,

	/// The number of bytes written across every file.
	pub bytes: u64,
}

/// Represents the outcome of a successful repack.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Repacked {
	/// The number of entries written.
	pub entries: usize,

	/// The number of bytes of content written, excluding padding.
	pub bytes: u64,

	/// The number of sectors occupied by the blob.
	pub sectors: u64,
}

/// Represents a file staged for repacking.
#[derive(Debug)]
struct Staged {
	relative: PathBuf,
	path: PathBuf,
	size: u64,
}

impl<'a> Options<'a> {
	/// Creates options for the current revision using the specified `table`.
	pub fn new(table: &'a dyn PathTable) -> Self {
		Self {
			revision: Revision::default(),
			table,
		}
	}

	/// Returns the options with the specified `revision` instead.
	pub fn with_revision(self, revision: Revision) -> Self {
		Self {
			revision,
			..self
		}
	}
}

impl fmt::Debug for Options<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Options").field("revision", &self.revision).finish_non_exhaustive()
	}
}

/// Attempts to unpack the archive found in `src` into the data directory of `dest`.
///
/// The archive is fully validated before anything is written: the index length, the extent of every entry,
/// and the number of paths produced by the table.
pub fn unpack<S, D>(src: S, dest: D, options: &Options) -> Result<Unpacked, Error>
where
	S: AsRef<Path>,
	D: AsRef<Path>,
{
	let (src, dest) = (src.as_ref(), dest.as_ref());

	// Locate and validate the archive.

	let blob_path = locate_blob(src, options.revision)?;
	let loc_path = locate(src, INDEX_NAME)?;

	let index = load_index(&loc_path)?;

	let mut blob = File::open(&blob_path).map_err(Error::io(&blob_path))?;
	let len = blob.metadata().map_err(Error::io(&blob_path))?.len();

	index.check_bounds(len)?;

	let paths = table_paths(options.table, index.len())?;

	// Extract every entry to its path.

	let data = dest.join(DATA_DIRECTORY);

	fs::create_dir_all(&data).map_err(Error::io(&data))?;

	info!(entries = index.len(), src = %src.display(), dest = %data.display(), "Unpacking files...");

	let mut archive = Archive::new(index, &mut blob);
	let mut bytes = 0;

	for (index, relative) in paths.iter().enumerate() {
		let path = data.join(relative);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).map_err(Error::io(parent))?;
		}

		let Some(mut entry) = archive.open(index) else {
			return Err(Error::TableMismatch {
				expected: index + 1,
				actual: paths.len(),
			});
		};

		let mut file = BufWriter::new(File::create(&path).map_err(Error::io(&path))?);

		let copied = io::copy(&mut entry, &mut file).map_err(Error::io(&path))?;

		file.flush().map_err(Error::io(&path))?;

		debug!(index, path = %relative.display(), size = copied, "Extracted entry");

		bytes += copied;
	}

	info!(entries = paths.len(), bytes, "Files unpacked");

	Ok(Unpacked {
		entries: paths.len(),
		bytes,
	})
}

/// Attempts to repack the data directory of `src` into a fresh archive within `dest`.
///
/// Every file predicted by the table must be present, and the combined size must be addressable,
/// before any output is created.
pub fn repack<S, D>(src: S, dest: D, options: &Options) -> Result<Repacked, Error>
where
	S: AsRef<Path>,
	D: AsRef<Path>,
{
	let (src, dest) = (src.as_ref(), dest.as_ref());

	let data = src.join(DATA_DIRECTORY);

	if !data.is_dir() {
		return Err(Error::MissingDirectory {
			name: DATA_DIRECTORY.to_owned(),
			dir: src.to_path_buf(),
		});
	}

	// Determine the number of entries, then the path of each of them.

	let count = match (options.revision.discovery(), options.table.expected_count()) {
		(Discovery::Table, Some(count)) => count,
		_ => count_files(&data)?,
	};

	let paths = table_paths(options.table, count as usize)?;

	// Check that every file exists and that the blob can address all of them.

	let mut staged = Vec::with_capacity(paths.len());
	let mut bytes = 0;
	let mut sectors = 0;

	for relative in paths {
		let path = data.join(&relative);

		let size = match fs::metadata(&path) {
			Ok(metadata) if metadata.is_file() => metadata.len(),
			Ok(_) => return Err(Error::MissingEntry(path)),
			Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(Error::MissingEntry(path)),
			Err(err) => return Err(Error::io(path)(err)),
		};

		bytes += size;
		sectors += sectors_for(size);

		staged.push(Staged {
			relative,
			path,
			size,
		});
	}

	if sectors * SECTOR_SIZE > MAX_BLOB_SIZE {
		return Err(Error::SizeLimit {
			size: sectors * SECTOR_SIZE,
		});
	}

	// Write the blob and the index.

	fs::create_dir_all(dest).map_err(Error::io(dest))?;

	let blob_path = dest.join(BLOB_NAME);
	let loc_path = dest.join(INDEX_NAME);

	let mut blob = BufWriter::new(File::create(&blob_path).map_err(Error::io(&blob_path))?);
	let mut loc = BufWriter::new(File::create(&loc_path).map_err(Error::io(&loc_path))?);

	info!(entries = staged.len(), src = %data.display(), dest = %dest.display(), revision = %options.revision, "Repacking files...");

	let mut writer = ArchiveWriter::new(&mut blob);

	for file in &staged {
		let mut src = File::open(&file.path).map_err(Error::io(&file.path))?;
		let record = writer.write(options.revision.flag(&file.relative), &mut src)?;

		if record.size as u64 != file.size {
			return Err(Error::Changed(file.path.clone()));
		}

		debug!(path = %file.relative.display(), position = record.position, size = record.size, sectors = record.sectors, "Stored entry");
	}

	let records = writer.finish(&mut loc)?;

	info!(entries = records.len(), bytes, sectors, "Done");

	Ok(Repacked {
		entries: records.len(),
		bytes,
		sectors,
	})
}

/// Attempts to read the index of the archive found in `src`, checking it against the blob.
pub fn inspect<S>(src: S, options: &Options) -> Result<Index, Error>
where
	S: AsRef<Path>,
{
	let src = src.as_ref();

	let blob_path = locate_blob(src, options.revision)?;
	let loc_path = locate(src, INDEX_NAME)?;

	let index = load_index(&loc_path)?;
	let len = fs::metadata(&blob_path).map_err(Error::io(&blob_path))?.len();

	index.check_bounds(len)?;

	Ok(index)
}

/// Reads the index stored at `path`, keeping I/O failures apart from an inconsistent index.
fn load_index(path: &Path) -> Result<Index, Error> {
	let mut loc = BufReader::new(File::open(path).map_err(Error::io(path))?);

	IndexReader::new(&mut loc).read().map_err(|err| match err {
		ReadError::IoError(source) => Error::Io {
			path: path.to_path_buf(),
			source,
		},
		err => Error::Read(err),
	})
}

/// Returns the path of the blob within `dir`, trying every name accepted by the revision.
fn locate_blob(dir: &Path, revision: Revision) -> Result<PathBuf, Error> {
	for &name in revision.blob_names() {
		let path = dir.join(name);

		if path.is_file() {
			if name != BLOB_NAME {
				warn!(name, "Using alternate blob name");
			}

			return Ok(path);
		}
	}

	Err(Error::MissingFile {
		name: BLOB_NAME.to_owned(),
		dir: dir.to_path_buf(),
	})
}

/// Returns the path of the file called `name` within `dir`, if it exists.
fn locate(dir: &Path, name: &str) -> Result<PathBuf, Error> {
	let path = dir.join(name);

	match path.is_file() {
		true => Ok(path),
		false => Err(Error::MissingFile {
			name: name.to_owned(),
			dir: dir.to_path_buf(),
		}),
	}
}

/// Returns exactly `count` paths from the table.
fn table_paths(table: &dyn PathTable, count: usize) -> Result<Vec<PathBuf>, Error> {
	let requested = u32::try_from(count).map_err(|_| Error::TableMismatch {
		expected: count,
		actual: 0,
	})?;

	let paths = table.paths(requested)?;

	if paths.len() != count {
		return Err(Error::TableMismatch {
			expected: count,
			actual: paths.len(),
		});
	}

	Ok(paths)
}

/// Returns the number of regular files within `dir`, recursively, counting links to regular files.
fn count_files(dir: &Path) -> Result<u32, Error> {
	let mut count: u32 = 0;

	for entry in WalkDir::new(dir).follow_links(true) {
		let entry = entry.map_err(|err| {
			let path = err.path().unwrap_or(dir).to_path_buf();

			Error::Io {
				path,
				source: err.into(),
			}
		})?;

		if entry.file_type().is_file() {
			count = count.saturating_add(1);
		}
	}

	Ok(count)
}

#[cfg(test)]
mod tests {
	use std::{fs, path::PathBuf};

	use crate::{
		error::{Error, ReadError},
		revision::Revision,
		table::{Manifest, Numbered},
	};

	use super::{count_files, load_index, locate_blob, table_paths};

	#[test]
	fn test_locate_blob_lowercase() {
		let dir = tempfile::tempdir().expect("failed to create directory");

		fs::write(dir.path().join("cddata.000"), b"").expect("failed to write blob");

		// Case-insensitive file systems cannot tell the names apart.

		let uppercase = dir.path().join("CDDATA.000").is_file();

		assert!(locate_blob(dir.path(), Revision::Current).is_ok());
		assert_eq!(locate_blob(dir.path(), Revision::Legacy).is_ok(), uppercase);
	}

	#[test]
	fn test_locate_blob_missing() {
		let dir = tempfile::tempdir().expect("failed to create directory");

		match locate_blob(dir.path(), Revision::Current) {
			Err(Error::MissingFile {
				name,
				..
			}) => assert_eq!(name, "CDDATA.000"),
			other => panic!("expected missing file, got {:?}", other),
		}
	}

	#[test]
	fn test_count_files() {
		let dir = tempfile::tempdir().expect("failed to create directory");

		fs::create_dir_all(dir.path().join("a/b")).expect("failed to create directories");
		fs::create_dir_all(dir.path().join("c")).expect("failed to create directories");
		fs::write(dir.path().join("a/one"), b"1").expect("failed to write file");
		fs::write(dir.path().join("a/b/two"), b"2").expect("failed to write file");
		fs::write(dir.path().join("three"), b"3").expect("failed to write file");

		assert_eq!(count_files(dir.path()).expect("failed to count files"), 3);
	}

	#[cfg(unix)]
	#[test]
	fn test_count_files_links() {
		let dir = tempfile::tempdir().expect("failed to create directory");
		let outside = tempfile::tempdir().expect("failed to create directory");

		fs::write(dir.path().join("one"), b"1").expect("failed to write file");
		fs::write(outside.path().join("two"), b"2").expect("failed to write file");
		std::os::unix::fs::symlink(outside.path().join("two"), dir.path().join("two")).expect("failed to link file");

		assert_eq!(count_files(dir.path()).expect("failed to count files"), 2);
	}

	#[test]
	fn test_load_index_missing() {
		let dir = tempfile::tempdir().expect("failed to create directory");
		let path = dir.path().join("CDDATA.LOC");

		match load_index(&path) {
			Err(Error::Io {
				path: failed,
				..
			}) => assert_eq!(failed, path),
			other => panic!("expected input/output error, got {:?}", other),
		}
	}

	#[test]
	fn test_load_index_invalid() {
		let dir = tempfile::tempdir().expect("failed to create directory");
		let path = dir.path().join("CDDATA.LOC");

		fs::write(&path, [1u8, 0, 0, 0]).expect("failed to write index");

		assert!(matches!(load_index(&path), Err(Error::Read(ReadError::InvalidLength { .. }))));
	}

	#[test]
	fn test_table_paths() {
		let paths = table_paths(&Numbered::default(), 2).expect("failed to get paths");

		assert_eq!(paths, vec![PathBuf::from("00000.bin"), PathBuf::from("00001.bin")]);

		let manifest = Manifest::from_reader(std::io::Cursor::new("a\n")).expect("failed to read manifest");

		assert!(matches!(table_paths(&manifest, 2), Err(Error::Table(_))));
	}
}
