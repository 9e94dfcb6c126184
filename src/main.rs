//! Command-line application for unpacking and repacking archives with the `cddata` library.

use std::{
	env,
	io::{self, BufRead},
	path::{Path, PathBuf},
	process::ExitCode,
};

use anyhow::Context;
use cddata::{
	revision::Revision,
	table::{Manifest, Numbered, PathTable},
	Options,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Unpacks and repacks the CDDATA.000/CDDATA.LOC archives of Jade Cocoon 2
///
/// Without an operation, an interactive menu working on the current directory is shown.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
	/// Indicates the operation to perform
	#[command(subcommand)]
	operation: Option<Operation>,

	/// Specifies the options shared by every operation
	#[command(flatten)]
	shared: Shared,

	/// Logs every entry as it is processed
	#[arg(short, long, global = true)]
	verbose: bool,
}

/// Represents the operation to perform
#[derive(Debug, Subcommand)]
enum Operation {
	/// Extract the contents of an archive to the data directory of an output directory
	#[command(alias = "0")]
	Unpack {
		/// Specifies the directory holding CDDATA.000 and CDDATA.LOC
		src: PathBuf,

		/// Specifies the output directory
		dest: PathBuf,
	},

	/// Build an archive from the data directory of an input directory
	#[command(alias = "1")]
	Repack {
		/// Specifies the directory holding the data directory
		src: PathBuf,

		/// Specifies the directory to write CDDATA.000 and CDDATA.LOC to
		dest: PathBuf,
	},

	/// Inspect the records of an archive
	Inspect {
		/// Specifies the directory holding CDDATA.000 and CDDATA.LOC
		src: PathBuf,
	},
}

/// Represents the options shared by every operation
#[derive(Debug, Args)]
struct Shared {
	/// Specifies the revision of the archive format
	#[arg(short, long, global = true, value_enum, default_value_t = RevisionArg::Current, env = "CDDATA_REVISION")]
	revision: RevisionArg,

	/// Specifies a manifest listing the path of every entry, one per line
	#[arg(short, long, global = true, env = "CDDATA_PATHS")]
	paths: Option<PathBuf>,

	/// Specifies the extension of numbered entries, when no manifest is given
	#[arg(short, long, global = true, default_value = "bin")]
	extension: String,
}

/// Represents the revision of an archive
#[derive(Debug, Clone, Copy, ValueEnum)]
enum RevisionArg {
	/// Dictates the trailing field marks `bin` files, and files to repack are counted
	Legacy,

	/// Dictates the trailing field is zero, and files to repack are taken from the table
	Current,
}

impl From<RevisionArg> for Revision {
	fn from(value: RevisionArg) -> Self {
		match value {
			RevisionArg::Legacy => Self::Legacy,
			RevisionArg::Current => Self::Current,
		}
	}
}

fn main() -> ExitCode {
	let cli = Cli::parse();

	// Honour `RUST_LOG` where set, otherwise log phases (or every entry when verbose).

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));

	tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

	let interactive = cli.operation.is_none();

	let result = run(cli);

	if let Err(err) = &result {
		error!("Error: {:#}", err);
	}

	// Keep the console open when launched without arguments.

	if interactive {
		println!("Press Enter to exit...");

		let _ = io::stdin().lock().read_line(&mut String::new());
	}

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(_) => ExitCode::FAILURE,
	}
}

fn run(cli: Cli) -> anyhow::Result<()> {
	let table: Box<dyn PathTable> = match &cli.shared.paths {
		Some(path) => {
			let manifest = Manifest::open(path).with_context(|| format!("failed to read manifest <{}>", path.display()))?;

			info!(paths = manifest.len(), "Read manifest");

			Box::new(manifest)
		}
		None => Box::new(Numbered::new(&cli.shared.extension)),
	};

	let options = Options::new(table.as_ref()).with_revision(cli.shared.revision.into());

	match cli.operation {
		Some(Operation::Unpack {
			src,
			dest,
		}) => unpack(&src, &dest, &options),
		Some(Operation::Repack {
			src,
			dest,
		}) => repack(&src, &dest, &options),
		Some(Operation::Inspect {
			src,
		}) => inspect(&src, &options),
		None => menu(&options),
	}
}

fn unpack(src: &Path, dest: &Path, options: &Options) -> anyhow::Result<()> {
	let unpacked = cddata::unpack(src, dest, options).context("failed to unpack archive")?;

	println!("{} files unpacked ({} bytes).", unpacked.entries, unpacked.bytes);

	Ok(())
}

fn repack(src: &Path, dest: &Path, options: &Options) -> anyhow::Result<()> {
	let repacked = cddata::repack(src, dest, options).context("failed to repack archive")?;

	println!("{} files repacked into {} sectors.", repacked.entries, repacked.sectors);

	Ok(())
}

fn inspect(src: &Path, options: &Options) -> anyhow::Result<()> {
	let index = cddata::inspect(src, options).context("failed to inspect archive")?;
	let paths = options.table.paths(index.len() as u32).context("failed to name entries")?;

	for (record, path) in index.iter().zip(&paths) {
		println!(
			"[{:<24}] position: {}, size: {}, sectors: {}, flag: {}",
			path.display(),
			record.position,
			record.size,
			record.sectors,
			record.flag
		);
	}

	println!("Inspected {} entries.", index.len());

	Ok(())
}

/// Prompts for an operation on standard input, working on the current directory.
fn menu(options: &Options) -> anyhow::Result<()> {
	println!("0. Unpacker\n1. Repacker\n");

	let mut choice = String::new();

	io::stdin().lock().read_line(&mut choice).context("failed to read choice")?;

	let current = env::current_dir().context("failed to get current directory")?;

	match choice.trim() {
		"0" => unpack(&current, &current, options),
		"1" => repack(&current, &current.join("Repacked"), options),
		other => anyhow::bail!("invalid choice <{}>, expected 0 (unpack) or 1 (repack)", other),
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use clap::Parser;

	use super::{Cli, Operation};

	#[test]
	fn test_parse_mode_selector() {
		let cli = Cli::try_parse_from(["cddata", "0", "disc", "extracted"]).expect("failed to parse unpack");

		assert!(matches!(
			cli.operation,
			Some(Operation::Unpack { src, dest }) if src == PathBuf::from("disc") && dest == PathBuf::from("extracted")
		));

		let cli = Cli::try_parse_from(["cddata", "1", "extracted", "Repacked"]).expect("failed to parse repack");

		assert!(matches!(cli.operation, Some(Operation::Repack { .. })));

		let cli = Cli::try_parse_from(["cddata", "repack", "extracted", "Repacked", "--revision", "legacy"]).expect("failed to parse repack");

		assert!(matches!(cli.operation, Some(Operation::Repack { .. })));
	}

	#[test]
	fn test_parse_menu() {
		let cli = Cli::try_parse_from(["cddata"]).expect("failed to parse");

		assert!(cli.operation.is_none());
	}
}
