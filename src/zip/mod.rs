//! ZIP archive indexing and entry streaming.
//!
//! ## Architecture
//!
//! - [`structures`]: Fixed-size ZIP headers (EOCD, central directory, local file)
//! - [`parser`]: Locating and walking those headers in a [`ReadAt`](crate::io::ReadAt) source
//! - [`tree`]: The case-insensitive directory tree of files
//! - [`index`]: [`ArchiveIndex`], the parsed, immutable view of one archive
//! - [`stream`]: [`EntryStream`], a seekable reader over one entry
//! - [`extractor`]: Whole-entry helpers (read, extract, verify)
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record, optionally followed by a comment
//!
//! ## Supported Features
//!
//! - STORED and raw DEFLATE entries
//! - Arbitrary bytes after the EOCD record
//!
//! ## Limitations
//!
//! - Read only
//! - No ZIP64, encryption, symlinks or multi-disk archives

pub mod extractor;
pub mod index;
pub mod parser;
pub mod stream;
pub mod structures;
pub mod tree;

pub use extractor::ZipExtractor;
pub use index::ArchiveIndex;
pub use parser::{CentralDirectoryRecord, ZipParser};
pub use stream::{EntryStream, STREAM_BUFFER_MAX};
pub use structures::*;
pub use tree::{Directory, FileEntry};
