//! # zipvfs
//!
//! A read-only virtual filesystem over ZIP archives.
//!
//! An [`ArchiveIndex`] parses an archive's central directory once into a
//! case-insensitive tree of directories and files. Each [`EntryStream`]
//! then reads one entry through its own file handle, inflating deflate
//! data on the fly and supporting arbitrary seeks.
//!
//! ## Features
//!
//! - Locates the end of central directory record behind comments or other trailing bytes
//! - Case-insensitive, segment-exact path lookup
//! - STORED and raw DEFLATE entries
//! - Backward seeks on compressed entries by restarting and replaying the decompressor
//! - Independent streams over a shared index
//!
//! ## Example
//!
//! ```no_run
//! use std::io::SeekFrom;
//! use zipvfs::{ArchiveIndex, EntryStream};
//!
//! fn main() -> zipvfs::Result<()> {
//!     let index = ArchiveIndex::open("assets.zip")?;
//!
//!     if let Some(dir) = index.find_directory("textures") {
//!         for file in dir.files() {
//!             println!("{} ({} bytes)", file.name(), file.uncompressed_size);
//!         }
//!     }
//!
//!     let mut stream = EntryStream::open(&index, "Textures/Stone.png")?;
//!     stream.seek(SeekFrom::Start(8))?;
//!     let mut header = [0u8; 16];
//!     let n = stream.read(&mut header)?;
//!     println!("read {n} bytes at offset 8, now at {}", stream.tell());
//!     stream.close();
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, HeaderKind, Result};
pub use io::{LocalFileReader, ReadAt};
pub use zip::{ArchiveIndex, CompressionMethod, Directory, EntryStream, FileEntry, ZipExtractor};
