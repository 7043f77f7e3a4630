//! Error types for archive indexing and entry streaming.
//!
//! Every fallible operation in the library returns [`Result<T>`]. Lookups
//! that can legitimately miss (`find_entry`, `find_directory`) return
//! `Option` instead, so a missing path is never confused with a broken
//! archive.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The three ZIP header kinds this crate parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    EndOfCentralDirectory,
    CentralDirectory,
    LocalFile,
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HeaderKind::EndOfCentralDirectory => "end of central directory",
            HeaderKind::CentralDirectory => "central directory",
            HeaderKind::LocalFile => "local file",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No end of central directory signature anywhere in the file.
    #[error("not a ZIP archive: end of central directory record not found")]
    EndRecordNotFound,

    #[error("corrupt {header} header at offset {offset:#x}")]
    BadSignature { header: HeaderKind, offset: u64 },

    #[error(
        "multi-disk archives are not supported (disk {disk_number}, central directory on disk {start_disk}, {disk_entries}/{total_entries} entries)"
    )]
    MultiDisk {
        disk_number: u16,
        start_disk: u16,
        disk_entries: u16,
        total_entries: u16,
    },

    /// Local header CRC-32 disagrees with the central directory.
    #[error(
        "archive integrity error in {name}: central directory CRC-32 {central:#010x}, local header {local:#010x}"
    )]
    CrcMismatch {
        name: String,
        central: u32,
        local: u32,
    },

    #[error("archive unreadable: {}", .path.display())]
    ArchiveUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Decompressed bytes disagree with the size or CRC-32 in the index.
    #[error(
        "content check failed for {name}: expected {expected_size} bytes with CRC-32 {expected_crc:#010x}, got {actual_size} bytes with CRC-32 {actual_crc:#010x}"
    )]
    ContentMismatch {
        name: String,
        expected_crc: u32,
        actual_crc: u32,
        expected_size: u64,
        actual_size: u64,
    },

    #[error("decompression failed: {0}")]
    Decompress(#[from] flate2::DecompressError),

    #[error("entry not found: {0}")]
    EntryNotFound(String),

    #[error("seek out of range: target {target}, entry size {size}")]
    SeekOutOfRange { target: i128, size: u64 },

    /// Compressed data ran out before the declared uncompressed size.
    #[error("unexpected end of entry data at position {position}")]
    UnexpectedEnd { position: u64 },

    #[error("stream is closed")]
    Closed,

    /// A previous decompression error left the stream unusable; seek to recover.
    #[error("stream is poisoned by an earlier decompression error")]
    Poisoned,
}

impl Error {
    /// True for the expected "no such entry" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::EntryNotFound(_))
    }

    /// True when the archive bytes themselves are damaged or inconsistent.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::EndRecordNotFound
                | Error::BadSignature { .. }
                | Error::CrcMismatch { .. }
                | Error::ContentMismatch { .. }
                | Error::Decompress(_)
                | Error::UnexpectedEnd { .. }
        )
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::Io(e) => e.kind(),
            Error::ArchiveUnreadable { source, .. } => source.kind(),
            Error::EntryNotFound(_) => io::ErrorKind::NotFound,
            Error::SeekOutOfRange { .. } => io::ErrorKind::InvalidInput,
            Error::UnexpectedEnd { .. } => io::ErrorKind::UnexpectedEof,
            Error::Closed | Error::Poisoned => io::ErrorKind::Other,
            _ => io::ErrorKind::InvalidData,
        };
        match err {
            Error::Io(e) => e,
            other => io::Error::new(kind, other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinct_from_corruption() {
        let missing = Error::EntryNotFound("a/b.txt".into());
        assert!(missing.is_not_found());
        assert!(!missing.is_corruption());

        let broken = Error::BadSignature {
            header: HeaderKind::CentralDirectory,
            offset: 0x40,
        };
        assert!(broken.is_corruption());
        assert!(!broken.is_not_found());
        assert_eq!(
            broken.to_string(),
            "corrupt central directory header at offset 0x40"
        );
    }

    #[test]
    fn io_conversion_keeps_kind() {
        let err: io::Error = Error::SeekOutOfRange { target: 9, size: 8 }.into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let err: io::Error = Error::EntryNotFound("x".into()).into();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let inner = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let err: io::Error = Error::Io(inner).into();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }
}
