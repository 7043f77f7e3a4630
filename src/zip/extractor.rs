use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

use super::index::ArchiveIndex;
use super::stream::{EntryStream, STREAM_BUFFER_MAX};

/// Whole-entry operations built on [`EntryStream`].
pub struct ZipExtractor<'a> {
    index: &'a ArchiveIndex,
}

impl<'a> ZipExtractor<'a> {
    pub fn new(index: &'a ArchiveIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &'a ArchiveIndex {
        self.index
    }

    /// Extract file data to memory
    pub fn read_to_vec(&self, path: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let mut stream = EntryStream::open(self.index, path)?;
        let mut data = Vec::with_capacity(stream.len() as usize);
        copy_stream(&mut stream, &mut data)?;
        Ok(data)
    }

    /// Stream an entry into `writer`, returning the bytes written.
    pub fn extract_to_writer<W: Write>(
        &self,
        path: impl AsRef<[u8]>,
        writer: &mut W,
    ) -> Result<u64> {
        let mut stream = EntryStream::open(self.index, path)?;
        let (written, _) = copy_stream(&mut stream, writer)?;
        Ok(written)
    }

    /// Extract file to disk
    pub fn extract_to_file(&self, path: impl AsRef<[u8]>, output_path: &Path) -> Result<u64> {
        // Create parent directories if needed
        if let Some(parent) = output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let path = path.as_ref();
        let mut file = fs::File::create(output_path)?;
        let written = self.extract_to_writer(path, &mut file)?;
        file.flush()?;
        debug!(
            entry = %String::from_utf8_lossy(path),
            output = %output_path.display(),
            written,
            "extracted"
        );
        Ok(written)
    }

    /// Decompress an entry fully and compare size and CRC-32 with the index.
    pub fn verify(&self, path: impl AsRef<[u8]>) -> Result<()> {
        let path = path.as_ref();
        let mut stream = EntryStream::open(self.index, path)?;
        let (actual_size, actual_crc) = copy_stream(&mut stream, &mut std::io::sink())?;
        let entry = stream.entry();

        if actual_size != entry.uncompressed_size || actual_crc != entry.crc32 {
            return Err(Error::ContentMismatch {
                name: String::from_utf8_lossy(path).into_owned(),
                expected_crc: entry.crc32,
                actual_crc,
                expected_size: entry.uncompressed_size,
                actual_size,
            });
        }
        Ok(())
    }
}

/// Copy the rest of `stream` into `writer`; returns (bytes, CRC-32).
fn copy_stream<W: Write>(stream: &mut EntryStream<'_>, writer: &mut W) -> Result<(u64, u32)> {
    let mut buf = vec![0u8; STREAM_BUFFER_MAX];
    let mut hasher = crc32fast::Hasher::new();
    let mut total = 0u64;

    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }

    stream.close();
    Ok((total, hasher.finalize()))
}
