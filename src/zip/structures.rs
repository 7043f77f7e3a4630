use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{Error, HeaderKind, Result};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    /// Any other non-zero code; inflated as raw deflate.
    Other(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Other(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Other(v) => *v,
        }
    }

    pub fn is_stored(&self) -> bool {
        *self == CompressionMethod::Stored
    }
}

fn check_signature(data: &[u8], signature: u32, header: HeaderKind, offset: u64) -> Result<()> {
    if data.len() < 4 || u32::from_le_bytes([data[0], data[1], data[2], data[3]]) != signature {
        return Err(Error::BadSignature { header, offset });
    }
    Ok(())
}

/// End of Central Directory (EOCD) - 22 bytes, comment excluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub start_disk: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: u32 = 0x06054b50;
    pub const SIZE: usize = 22;

    /// Parse the record at `offset`; `data` starts at the signature.
    pub fn from_bytes(data: &[u8], offset: u64) -> Result<Self> {
        let header = HeaderKind::EndOfCentralDirectory;
        if data.len() < Self::SIZE {
            return Err(Error::BadSignature { header, offset });
        }
        check_signature(data, Self::SIGNATURE, header, offset)?;

        let mut cursor = Cursor::new(&data[4..Self::SIZE]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            start_disk: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    /// Reject spanned archives.
    pub fn ensure_single_disk(&self) -> Result<()> {
        if self.disk_number != 0
            || self.start_disk != 0
            || self.disk_entries != self.total_entries
        {
            return Err(Error::MultiDisk {
                disk_number: self.disk_number,
                start_disk: self.start_disk,
                disk_entries: self.disk_entries,
                total_entries: self.total_entries,
            });
        }
        Ok(())
    }
}

/// Central Directory File Header (CDFH) - 46 fixed bytes, then name/extra/comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
    pub comment_len: u16,
    pub disk_number_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub lfh_offset: u32,
}

impl CentralDirectoryHeader {
    pub const SIGNATURE: u32 = 0x02014b50;
    pub const SIZE: usize = 46;

    pub fn from_bytes(data: &[u8], offset: u64) -> Result<Self> {
        let header = HeaderKind::CentralDirectory;
        if data.len() < Self::SIZE {
            return Err(Error::BadSignature { header, offset });
        }
        check_signature(data, Self::SIGNATURE, header, offset)?;

        let mut cursor = Cursor::new(&data[4..Self::SIZE]);

        Ok(Self {
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            flags: cursor.read_u16::<LittleEndian>()?,
            compression_method: cursor.read_u16::<LittleEndian>()?,
            last_mod_time: cursor.read_u16::<LittleEndian>()?,
            last_mod_date: cursor.read_u16::<LittleEndian>()?,
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>()?,
            name_len: cursor.read_u16::<LittleEndian>()?,
            extra_len: cursor.read_u16::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
            disk_number_start: cursor.read_u16::<LittleEndian>()?,
            internal_attrs: cursor.read_u16::<LittleEndian>()?,
            external_attrs: cursor.read_u32::<LittleEndian>()?,
            lfh_offset: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Bytes this header occupies on disk, variable fields included.
    pub fn total_size(&self) -> u64 {
        Self::SIZE as u64 + self.name_len as u64 + self.extra_len as u64 + self.comment_len as u64
    }
}

/// Local File Header (LFH) - 30 fixed bytes, then name/extra
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: u32 = 0x04034b50;
    pub const SIZE: usize = 30;

    pub fn from_bytes(data: &[u8], offset: u64) -> Result<Self> {
        let header = HeaderKind::LocalFile;
        if data.len() < Self::SIZE {
            return Err(Error::BadSignature { header, offset });
        }
        check_signature(data, Self::SIGNATURE, header, offset)?;

        let mut cursor = Cursor::new(&data[4..Self::SIZE]);

        Ok(Self {
            version_needed: cursor.read_u16::<LittleEndian>()?,
            flags: cursor.read_u16::<LittleEndian>()?,
            compression_method: cursor.read_u16::<LittleEndian>()?,
            last_mod_time: cursor.read_u16::<LittleEndian>()?,
            last_mod_date: cursor.read_u16::<LittleEndian>()?,
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>()?,
            name_len: cursor.read_u16::<LittleEndian>()?,
            extra_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    /// Offset of the entry data, given where this header starts.
    pub fn data_offset(&self, header_offset: u64) -> u64 {
        header_offset + Self::SIZE as u64 + self.name_len as u64 + self.extra_len as u64
    }
}
