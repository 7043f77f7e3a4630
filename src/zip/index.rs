use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::io::LocalFileReader;

use super::parser::ZipParser;
use super::tree::{Directory, FileEntry, segments, split_parent, strip_root};

/// Immutable index of one ZIP archive.
///
/// Built in a single pass over the central directory. Either every
/// declared entry parses and the whole tree is returned, or nothing is.
/// The index holds no open file handle; streams open their own.
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    source_path: PathBuf,
    root: Directory,
}

impl ArchiveIndex {
    /// Parse the archive at `path` into an index.
    ///
    /// # Errors
    ///
    /// - [`Error::ArchiveUnreadable`] if the file cannot be opened
    /// - [`Error::EndRecordNotFound`] if no end of central directory record exists
    /// - [`Error::MultiDisk`] for spanned archives
    /// - [`Error::BadSignature`] for any malformed central directory header
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = LocalFileReader::new(path).map_err(|source| Error::ArchiveUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let parser = ZipParser::new(reader);

        let (eocd, _) = parser.find_eocd()?;
        eocd.ensure_single_disk()?;

        let records = parser.read_central_directory(&eocd)?;

        let mut root = Directory::root();
        for record in &records {
            root.insert(&record.name, &record.header);
        }

        debug!(
            path = %path.display(),
            entries = records.len(),
            "indexed archive"
        );

        Ok(Self {
            source_path: path.to_path_buf(),
            root,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// Resolve a directory path case-insensitively.
    ///
    /// A trailing `/` is optional; `""` and `"/"` name the root. Nothing
    /// is created by a lookup. Paths are matched byte for byte apart from
    /// ASCII case, so names that are not UTF-8 can be looked up too.
    pub fn find_directory(&self, path: impl AsRef<[u8]>) -> Option<&Directory> {
        let path = strip_root(path.as_ref());
        let path = path.strip_suffix(b"/").unwrap_or(path);
        if path.is_empty() {
            return Some(&self.root);
        }
        self.root.walk(segments(path))
    }

    /// Resolve a file path case-insensitively.
    ///
    /// Paths ending in `/` name directories and never resolve here.
    pub fn find_entry(&self, path: impl AsRef<[u8]>) -> Option<&FileEntry> {
        let path = strip_root(path.as_ref());
        if path.is_empty() || path.ends_with(b"/") {
            return None;
        }

        let (dir, name) = match split_parent(path) {
            (Some(dirs), name) => (self.root.walk(segments(dirs))?, name),
            (None, name) => (&self.root, name),
        };
        dir.find_file(name)
    }

    /// Every file in the archive with its raw full path, depth first.
    pub fn entries(&self) -> Vec<(Vec<u8>, &FileEntry)> {
        let mut out = Vec::new();
        self.root
            .visit_files(b"", &mut |path, entry| out.push((path, entry)));
        out
    }

    pub fn file_count(&self) -> usize {
        self.root.file_count()
    }
}
