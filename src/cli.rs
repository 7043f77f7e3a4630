use std::path::{Component, PathBuf};

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "zipvfs")]
#[command(version)]
#[command(about = "Browse and read ZIP archives as a read-only filesystem", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipvfs -l data.zip                  show the directory tree of data.zip\n  \
  zipvfs -p data.zip Docs/readme.txt  send one entry to stdout\n  \
  zipvfs -p -s 1024 data.zip big.bin  start reading big.bin at byte 1024\n  \
  zipvfs -t data.zip                  check every entry against its CRC-32")]
pub struct Cli {
    /// ZIP file path
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Entries or directories to operate on (default: all), matched case-insensitively
    #[arg(value_name = "PATHS")]
    pub paths: Vec<String>,

    /// List the directory tree
    #[arg(short = 'l')]
    pub list: bool,

    /// Verbose listing and debug logging
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Test archive entries (decompress and check CRC-32)
    #[arg(short = 't')]
    pub test: bool,

    /// Seek to this offset within each entry before reading (pipe mode)
    #[arg(short = 's', value_name = "OFFSET", default_value_t = 0)]
    pub offset: u64,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Destination of an entry, honouring `-d` and `-j`.
    ///
    /// Returns `None` when the entry path could land outside the
    /// destination: absolute paths, drive prefixes and `..` segments.
    pub fn output_path(&self, entry_path: &[u8]) -> Option<PathBuf> {
        let mut relative = PathBuf::new();
        for component in entry_path_buf(entry_path).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }

        if self.junk_paths {
            relative = PathBuf::from(relative.file_name()?);
        }
        if relative.as_os_str().is_empty() {
            return None;
        }

        Some(match self.extract_dir {
            Some(ref dir) => PathBuf::from(dir).join(relative),
            None => relative,
        })
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.is_very_quiet() {
            "error"
        } else if self.verbose {
            "zipvfs=debug"
        } else {
            "warn"
        }
    }
}

#[cfg(unix)]
fn entry_path_buf(raw: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(raw))
}

#[cfg(not(unix))]
fn entry_path_buf(raw: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(raw).into_owned())
}
