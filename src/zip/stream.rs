//! Seekable streaming reader for a single archive entry.
//!
//! Deflate can only run forwards, so a backward seek throws the
//! decompressor away, starts a fresh one at the entry's data offset and
//! replays output up to the target. Forward seeks decompress and discard.

use std::io::{self, SeekFrom};

use flate2::{Decompress, FlushDecompress, Status};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::io::{LocalFileReader, ReadAt};

use super::index::ArchiveIndex;
use super::parser::ZipParser;
use super::tree::FileEntry;

/// Upper bound on the compressed read-ahead buffer of one stream.
pub const STREAM_BUFFER_MAX: usize = 32 * 1024;

/// Scratch space for output discarded while seeking.
const DISCARD_BUFFER_SIZE: usize = 4096;

/// Raw-deflate decoder plus its compressed read-ahead buffer.
struct Inflate {
    decompress: Decompress,
    buffer: Box<[u8]>,
    /// Unconsumed input is `buffer[pos..filled]`.
    pos: usize,
    filled: usize,
    poisoned: bool,
}

impl Inflate {
    fn new(capacity: usize) -> Self {
        Self {
            // false: raw deflate, no zlib header
            decompress: Decompress::new(false),
            buffer: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
            filled: 0,
            poisoned: false,
        }
    }

    /// Replace the decoder with a fresh one and drop any buffered input.
    fn restart(&mut self) {
        self.decompress = Decompress::new(false);
        self.pos = 0;
        self.filled = 0;
        self.poisoned = false;
    }

    /// Inflate into `out` until it is full, the deflate stream ends, or no
    /// further progress is possible.
    fn read(
        &mut self,
        file: &LocalFileReader,
        data_start: u64,
        compressed_size: u64,
        compressed_cursor: &mut u64,
        out: &mut [u8],
    ) -> Result<usize> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }

        let mut written = 0;
        while written < out.len() {
            if self.pos == self.filled {
                let left = compressed_size - *compressed_cursor;
                if left > 0 {
                    let want = (self.buffer.len() as u64).min(left) as usize;
                    let offset = data_start + *compressed_cursor;
                    let got = file.read_at(offset, &mut self.buffer[..want])?;
                    *compressed_cursor += got as u64;
                    self.pos = 0;
                    self.filled = got;
                }
            }

            let before_in = self.decompress.total_in();
            let before_out = self.decompress.total_out();

            let status = match self.decompress.decompress(
                &self.buffer[self.pos..self.filled],
                &mut out[written..],
                FlushDecompress::None,
            ) {
                Ok(status) => status,
                Err(e) => {
                    self.poisoned = true;
                    return Err(e.into());
                }
            };

            let consumed = (self.decompress.total_in() - before_in) as usize;
            let produced = (self.decompress.total_out() - before_out) as usize;
            self.pos += consumed;
            written += produced;

            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError => {
                    if consumed == 0 && produced == 0 {
                        break;
                    }
                }
            }
        }

        Ok(written)
    }
}

struct Handle {
    file: LocalFileReader,
    /// Present only for compressed entries.
    inflate: Option<Inflate>,
}

/// A read cursor over one entry's uncompressed bytes.
///
/// Every stream opens its own file handle, so any number of streams over
/// the same index (or the same entry) can run side by side.
///
/// Positions are relative to the start of the entry's data for stored and
/// compressed entries alike.
pub struct EntryStream<'a> {
    entry: &'a FileEntry,
    /// First byte after the local header, its name and its extra field.
    base_addr: u64,
    compressed_cursor: u64,
    uncompressed_cursor: u64,
    handle: Option<Handle>,
}

impl<'a> EntryStream<'a> {
    /// Open `path` inside `index` for reading.
    ///
    /// # Errors
    ///
    /// - [`Error::EntryNotFound`] if `path` does not name a file
    /// - [`Error::ArchiveUnreadable`] if the archive can no longer be opened
    /// - [`Error::BadSignature`] if the local header is missing
    /// - [`Error::CrcMismatch`] if the local header disagrees with the index
    pub fn open(index: &'a ArchiveIndex, path: impl AsRef<[u8]>) -> Result<Self> {
        let raw = path.as_ref();
        let path = String::from_utf8_lossy(raw);
        let entry = index
            .find_entry(raw)
            .ok_or_else(|| Error::EntryNotFound(path.to_string()))?;

        let source = index.source_path();
        let file = LocalFileReader::new(source).map_err(|source_err| Error::ArchiveUnreadable {
            path: source.to_path_buf(),
            source: source_err,
        })?;

        let parser = ZipParser::new(file);
        let local = parser.read_local_header(entry.local_header_offset)?;
        if local.crc32 != entry.crc32 {
            warn!(
                entry = %path,
                central = entry.crc32,
                local = local.crc32,
                "local header CRC-32 does not match central directory"
            );
            return Err(Error::CrcMismatch {
                name: path.to_string(),
                central: entry.crc32,
                local: local.crc32,
            });
        }
        let base_addr = local.data_offset(entry.local_header_offset);

        let inflate = if entry.is_stored() {
            None
        } else {
            let capacity = entry.compressed_size.min(STREAM_BUFFER_MAX as u64) as usize;
            Some(Inflate::new(capacity))
        };

        debug!(
            entry = %path,
            base_addr,
            method = entry.compression_method.as_u16(),
            size = entry.uncompressed_size,
            "opened entry stream"
        );

        Ok(Self {
            entry,
            base_addr,
            compressed_cursor: 0,
            uncompressed_cursor: 0,
            handle: Some(Handle {
                file: parser.into_reader(),
                inflate,
            }),
        })
    }

    pub fn entry(&self) -> &'a FileEntry {
        self.entry
    }

    /// Uncompressed size of the entry.
    pub fn len(&self) -> u64 {
        self.entry.uncompressed_size
    }

    pub fn is_empty(&self) -> bool {
        self.entry.uncompressed_size == 0
    }

    /// Archive offset of the entry's first data byte.
    pub fn data_offset(&self) -> u64 {
        self.base_addr
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Read up to `buf.len()` bytes, never past the end of the entry.
    ///
    /// Returns `0` at the end of the entry. After a decompression error
    /// the stream refuses further reads until it is seeked.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let handle = self.handle.as_mut().ok_or(Error::Closed)?;

        let remaining = self.entry.uncompressed_size - self.uncompressed_cursor;
        let want = (buf.len() as u64).min(remaining) as usize;
        if want == 0 {
            return Ok(0);
        }
        let out = &mut buf[..want];

        let n = match handle.inflate.as_mut() {
            None => read_stored(&handle.file, self.base_addr + self.uncompressed_cursor, out)?,
            Some(inflate) => inflate.read(
                &handle.file,
                self.base_addr,
                self.entry.compressed_size,
                &mut self.compressed_cursor,
                out,
            )?,
        };

        self.uncompressed_cursor += n as u64;
        Ok(n)
    }

    /// Move the read position, with the usual [`SeekFrom`] semantics.
    ///
    /// Targets past the end of the entry fail with
    /// [`Error::SeekOutOfRange`] and leave the position untouched.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        if self.handle.is_none() {
            return Err(Error::Closed);
        }

        let size = self.entry.uncompressed_size;
        let target = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::Current(delta) => self.uncompressed_cursor as i128 + delta as i128,
            SeekFrom::End(delta) => size as i128 + delta as i128,
        };
        if target < 0 || target > size as i128 {
            return Err(Error::SeekOutOfRange { target, size });
        }
        let target = target as u64;

        let handle = self.handle.as_mut().ok_or(Error::Closed)?;
        match handle.inflate.as_mut() {
            None => {
                self.uncompressed_cursor = target;
                return Ok(target);
            }
            Some(inflate) => {
                if target < self.uncompressed_cursor || inflate.poisoned {
                    debug!(
                        from = self.uncompressed_cursor,
                        to = target,
                        "restarting decompressor"
                    );
                    inflate.restart();
                    self.compressed_cursor = 0;
                    self.uncompressed_cursor = 0;
                }
            }
        }

        self.skip_to(target)?;
        Ok(self.uncompressed_cursor)
    }

    /// Decompress and discard until the cursor reaches `target`.
    fn skip_to(&mut self, target: u64) -> Result<()> {
        let mut scratch = [0u8; DISCARD_BUFFER_SIZE];
        while self.uncompressed_cursor < target {
            let step = (target - self.uncompressed_cursor).min(DISCARD_BUFFER_SIZE as u64) as usize;
            if self.read(&mut scratch[..step])? == 0 {
                return Err(Error::UnexpectedEnd {
                    position: self.uncompressed_cursor,
                });
            }
        }
        Ok(())
    }

    /// Current position in the uncompressed entry data.
    pub fn tell(&self) -> u64 {
        self.uncompressed_cursor
    }

    /// Release the file handle, decompressor and buffer.
    ///
    /// Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            debug!(entry = %self.entry.name(), "closed entry stream");
        }
    }
}

fn read_stored(file: &LocalFileReader, offset: u64, out: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < out.len() {
        let n = file.read_at(offset + filled as u64, &mut out[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

impl io::Read for EntryStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        EntryStream::read(self, buf).map_err(Into::into)
    }
}

impl io::Seek for EntryStream<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        EntryStream::seek(self, pos).map_err(Into::into)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.tell())
    }
}
