//! Shared test utilities for integration tests.
//!
//! Archives are written by hand so tests control every header byte.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use tempfile::TempDir;

pub const STORED: u16 = 0;
pub const DEFLATE: u16 = 8;

/// 1980-01-01, the DOS epoch.
const DOS_DATE: u16 = (1 << 5) | 1;

struct Entry {
    name: Vec<u8>,
    method: u16,
    compressed: Vec<u8>,
    uncompressed_size: u32,
    crc32: u32,
    local_crc32: u32,
}

/// Byte offsets of the headers in a built archive.
#[derive(Debug, Default)]
pub struct Layout {
    pub local_headers: Vec<usize>,
    pub central_headers: Vec<usize>,
    pub eocd: usize,
}

#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<Entry>,
    comment: Vec<u8>,
    trailer: Vec<u8>,
    disk_number: u16,
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: impl AsRef<[u8]>, data: &[u8]) -> Self {
        let crc = crc32fast::hash(data);
        self.custom(name, STORED, data.to_vec(), data.len() as u32, crc)
    }

    pub fn deflated(self, name: impl AsRef<[u8]>, data: &[u8]) -> Self {
        let crc = crc32fast::hash(data);
        self.custom(name, DEFLATE, deflate(data), data.len() as u32, crc)
    }

    /// Directory-only entry; `name` should end in `/`.
    pub fn directory(self, name: impl AsRef<[u8]>) -> Self {
        self.custom(name, STORED, Vec::new(), 0, 0)
    }

    /// Entry with caller-supplied compressed bytes and metadata.
    pub fn custom(
        mut self,
        name: impl AsRef<[u8]>,
        method: u16,
        compressed: Vec<u8>,
        uncompressed_size: u32,
        crc32: u32,
    ) -> Self {
        self.entries.push(Entry {
            name: name.as_ref().to_vec(),
            method,
            compressed,
            uncompressed_size,
            crc32,
            local_crc32: crc32,
        });
        self
    }

    /// Make the most recent entry's local header carry a different CRC-32.
    pub fn with_local_crc(mut self, crc32: u32) -> Self {
        if let Some(last) = self.entries.last_mut() {
            last.local_crc32 = crc32;
        }
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Bytes appended after the EOCD record and its comment.
    pub fn trailer(mut self, trailer: &[u8]) -> Self {
        self.trailer = trailer.to_vec();
        self
    }

    pub fn disk_number(mut self, disk: u16) -> Self {
        self.disk_number = disk;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_with_layout().0
    }

    pub fn build_with_layout(&self) -> (Vec<u8>, Layout) {
        let mut out: Vec<u8> = Vec::new();
        let mut layout = Layout::default();

        for entry in &self.entries {
            layout.local_headers.push(out.len());
            // Unknown extra field in the local header only: id 0xcafe, 4 bytes.
            let extra: &[u8] = &[0xfe, 0xca, 0x04, 0x00, 1, 2, 3, 4];

            out.write_u32::<LittleEndian>(0x04034b50).unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(entry.method).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(DOS_DATE).unwrap();
            out.write_u32::<LittleEndian>(entry.local_crc32).unwrap();
            out.write_u32::<LittleEndian>(entry.compressed.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(entry.uncompressed_size).unwrap();
            out.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(extra.len() as u16).unwrap();
            out.extend_from_slice(&entry.name);
            out.extend_from_slice(extra);
            out.extend_from_slice(&entry.compressed);
        }

        let cd_offset = out.len();
        for (entry, &local) in self.entries.iter().zip(&layout.local_headers) {
            layout.central_headers.push(out.len());
            out.write_u32::<LittleEndian>(0x02014b50).unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(entry.method).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(DOS_DATE).unwrap();
            out.write_u32::<LittleEndian>(entry.crc32).unwrap();
            out.write_u32::<LittleEndian>(entry.compressed.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(entry.uncompressed_size).unwrap();
            out.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(local as u32).unwrap();
            out.extend_from_slice(&entry.name);
        }
        let cd_size = out.len() - cd_offset;

        layout.eocd = out.len();
        let count = self.entries.len() as u16;
        out.write_u32::<LittleEndian>(0x06054b50).unwrap();
        out.write_u16::<LittleEndian>(self.disk_number).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(count).unwrap();
        out.write_u16::<LittleEndian>(count).unwrap();
        out.write_u32::<LittleEndian>(cd_size as u32).unwrap();
        out.write_u32::<LittleEndian>(cd_offset as u32).unwrap();
        out.write_u16::<LittleEndian>(self.comment.len() as u16).unwrap();
        out.extend_from_slice(&self.comment);
        out.extend_from_slice(&self.trailer);

        (out, layout)
    }
}

/// Write `bytes` to `name` inside a fresh temporary directory.
pub fn write_archive(bytes: &[u8], name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    (dir, path)
}

/// Deterministic test data: text runs interleaved with incompressible noise.
pub fn sample_data(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    let text = b"The quick brown fox jumps over the lazy dog. ";
    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        for &b in text.iter().cycle().take(300) {
            data.push(b);
        }
        for _ in 0..300 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            data.push(state as u8);
        }
    }
    data.truncate(len);
    data
}

/// The two-entry archive used across tests.
pub fn hello_world_archive() -> ZipBuilder {
    ZipBuilder::new()
        .stored("a.txt", b"hello")
        .deflated("dir/b.txt", b"world!!!")
}
