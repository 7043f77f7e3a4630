//! In-memory directory tree built from the central directory.
//!
//! Every node owns its children outright; dropping the root drops the
//! whole tree. Names are kept as the raw bytes stored in the archive,
//! which need not be UTF-8, and are always compared ASCII
//! case-insensitively.

use std::borrow::Cow;

use super::structures::{CentralDirectoryHeader, CompressionMethod};

/// A file recorded in the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    name: Vec<u8>,
    pub local_header_offset: u64,
    pub crc32: u32,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
}

impl FileEntry {
    pub(crate) fn from_header(name: &[u8], header: &CentralDirectoryHeader) -> Self {
        Self {
            name: name.to_vec(),
            local_header_offset: header.lfh_offset as u64,
            crc32: header.crc32,
            compression_method: CompressionMethod::from_u16(header.compression_method),
            compressed_size: header.compressed_size as u64,
            uncompressed_size: header.uncompressed_size as u64,
            last_mod_time: header.last_mod_time,
            last_mod_date: header.last_mod_date,
        }
    }

    /// Final path segment for display; invalid UTF-8 becomes U+FFFD.
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Final path segment exactly as stored in the archive.
    pub fn name_bytes(&self) -> &[u8] {
        &self.name
    }

    pub fn is_stored(&self) -> bool {
        self.compression_method.is_stored()
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Directory {
    name: Vec<u8>,
    subdirectories: Vec<Directory>,
    files: Vec<FileEntry>,
}

impl Directory {
    pub(crate) fn root() -> Self {
        Self::default()
    }

    fn named(name: &[u8]) -> Self {
        Self {
            name: name.to_vec(),
            ..Self::default()
        }
    }

    /// Path segment of this directory for display; empty for the root.
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    pub fn name_bytes(&self) -> &[u8] {
        &self.name
    }

    pub fn subdirectories(&self) -> &[Directory] {
        &self.subdirectories
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.subdirectories.is_empty() && self.files.is_empty()
    }

    pub fn find_subdirectory(&self, name: impl AsRef<[u8]>) -> Option<&Directory> {
        let name = name.as_ref();
        self.subdirectories
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    pub fn find_file(&self, name: impl AsRef<[u8]>) -> Option<&FileEntry> {
        let name = name.as_ref();
        self.files.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Number of files in this directory and every directory below it.
    pub fn file_count(&self) -> usize {
        self.files.len()
            + self
                .subdirectories
                .iter()
                .map(Directory::file_count)
                .sum::<usize>()
    }

    fn affirm_subdirectory(&mut self, name: &[u8]) -> &mut Directory {
        match self
            .subdirectories
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))
        {
            Some(i) => &mut self.subdirectories[i],
            None => {
                self.subdirectories.push(Directory::named(name));
                let last = self.subdirectories.len() - 1;
                &mut self.subdirectories[last]
            }
        }
    }

    /// Insert a central-directory path below this node.
    ///
    /// Every segment but the last becomes a directory; a non-empty last
    /// segment becomes a file. Paths ending in `/` only create directories.
    pub(crate) fn insert(&mut self, path: &[u8], header: &CentralDirectoryHeader) {
        let (dirs, file_name) = split_parent(strip_root(path));

        let mut dir = self;
        if let Some(dirs) = dirs {
            for segment in segments(dirs) {
                dir = dir.affirm_subdirectory(segment);
            }
        }

        if !file_name.is_empty() {
            dir.files.push(FileEntry::from_header(file_name, header));
        }
    }

    /// Walk `segments` from this node without creating anything.
    pub(crate) fn walk<'a, I>(&self, segments: I) -> Option<&Directory>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut dir = self;
        for segment in segments {
            dir = dir.find_subdirectory(segment)?;
        }
        Some(dir)
    }

    /// Depth-first walk calling `f` with each file's full path.
    pub(crate) fn visit_files<'a>(
        &'a self,
        prefix: &[u8],
        f: &mut impl FnMut(Vec<u8>, &'a FileEntry),
    ) {
        for file in &self.files {
            f([prefix, file.name.as_slice()].concat(), file);
        }
        for sub in &self.subdirectories {
            sub.visit_files(&[prefix, sub.name.as_slice(), &b"/"[..]].concat(), f);
        }
    }
}

/// Drop one leading separator.
pub(crate) fn strip_root(path: &[u8]) -> &[u8] {
    path.strip_prefix(b"/").unwrap_or(path)
}

/// Split at the last `/` into (parent, final segment).
pub(crate) fn split_parent(path: &[u8]) -> (Option<&[u8]>, &[u8]) {
    match path.iter().rposition(|&b| b == b'/') {
        Some(i) => (Some(&path[..i]), &path[i + 1..]),
        None => (None, path),
    }
}

pub(crate) fn segments(path: &[u8]) -> impl Iterator<Item = &[u8]> {
    path.split(|&b| b == b'/')
}
