//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Scan backwards for the End of Central Directory (EOCD) record
//! 2. Walk the Central Directory, one variable-length header at a time
//! 3. When an entry is opened, read its Local File Header to find the data
//!
//! Anything may trail the EOCD record (an archive comment, or junk appended
//! by other tools), so its position is found by signature, never assumed.

use tracing::{debug, trace};

use crate::error::{Error, HeaderKind, Result};
use crate::io::ReadAt;

use super::structures::*;

/// Window size for the backward EOCD scan.
const SCAN_BUFFER_SIZE: usize = 256;

/// Bytes shared by neighbouring scan windows so a signature split across
/// a window boundary is still seen whole.
const SCAN_OVERLAP: usize = 4 - 1;

/// One central directory record with its raw path bytes.
#[derive(Debug, Clone)]
pub struct CentralDirectoryRecord {
    pub name: Vec<u8>,
    pub header: CentralDirectoryHeader,
    /// Where the header starts in the archive.
    pub offset: u64,
}

/// Low-level ZIP file parser.
///
/// Generic over the data source so the same code parses files on disk
/// and archives already in memory.
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: R,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    pub fn new(reader: R) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Scans from the end of the file towards the start in overlapping
    /// windows and stops at the highest-offset signature that leaves room
    /// for a full record.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in file).
    ///
    /// # Errors
    ///
    /// [`Error::EndRecordNotFound`] if the scan reaches the start of the
    /// file without a match.
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let signature = EndOfCentralDirectory::SIGNATURE.to_le_bytes();
        let step = (SCAN_BUFFER_SIZE - SCAN_OVERLAP) as u64;
        let mut buf = [0u8; SCAN_BUFFER_SIZE];
        let mut cursor = self.size;

        while cursor > 0 {
            cursor = cursor.saturating_sub(step);
            let scan_size = (SCAN_BUFFER_SIZE as u64).min(self.size - cursor) as usize;
            let window = &mut buf[..scan_size];
            self.reader.read_exact_at(cursor, window)?;

            if scan_size < signature.len() {
                continue;
            }

            for i in (0..=scan_size - signature.len()).rev() {
                if window[i..i + signature.len()] != signature {
                    continue;
                }

                let offset = cursor + i as u64;
                if self.size - offset < EndOfCentralDirectory::SIZE as u64 {
                    trace!(offset, "signature too close to end of file for an EOCD record");
                    continue;
                }

                let mut record = [0u8; EndOfCentralDirectory::SIZE];
                self.reader.read_exact_at(offset, &mut record)?;
                let eocd = EndOfCentralDirectory::from_bytes(&record, offset)?;
                debug!(
                    offset,
                    entries = eocd.total_entries,
                    cd_offset = eocd.cd_offset,
                    "found end of central directory"
                );
                return Ok((eocd, offset));
            }
        }

        Err(Error::EndRecordNotFound)
    }

    /// Read every central directory record declared by `eocd`.
    ///
    /// Stops at the first bad header; no partial listing is returned.
    pub fn read_central_directory(
        &self,
        eocd: &EndOfCentralDirectory,
    ) -> Result<Vec<CentralDirectoryRecord>> {
        let mut records = Vec::with_capacity(eocd.total_entries as usize);
        let mut offset = eocd.cd_offset as u64;
        let mut fixed = [0u8; CentralDirectoryHeader::SIZE];

        for _ in 0..eocd.total_entries {
            self.reader
                .read_exact_at(offset, &mut fixed)
                .map_err(|e| truncated(e, HeaderKind::CentralDirectory, offset))?;
            let header = CentralDirectoryHeader::from_bytes(&fixed, offset)?;

            // Names are not required to be UTF-8; keep the bytes as stored.
            let mut name = vec![0u8; header.name_len as usize];
            self.reader
                .read_exact_at(offset + CentralDirectoryHeader::SIZE as u64, &mut name)
                .map_err(|e| truncated(e, HeaderKind::CentralDirectory, offset))?;

            trace!(
                name = %String::from_utf8_lossy(&name),
                method = header.compression_method,
                size = header.uncompressed_size,
                "central directory entry"
            );

            let next = offset + header.total_size();
            records.push(CentralDirectoryRecord {
                name,
                header,
                offset,
            });
            offset = next;
        }

        Ok(records)
    }

    /// Read and validate the Local File Header at `offset`.
    pub fn read_local_header(&self, offset: u64) -> Result<LocalFileHeader> {
        let mut buf = [0u8; LocalFileHeader::SIZE];
        self.reader
            .read_exact_at(offset, &mut buf)
            .map_err(|e| truncated(e, HeaderKind::LocalFile, offset))?;
        LocalFileHeader::from_bytes(&buf, offset)
    }

    pub fn into_reader(self) -> R {
        self.reader
    }
}

/// A header cut short by the end of the file is a corrupt header.
fn truncated(err: std::io::Error, header: HeaderKind, offset: u64) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::BadSignature { header, offset }
    } else {
        Error::Io(err)
    }
}
