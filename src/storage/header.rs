//! Stack file header.
//!
//! Every stack file starts with a [`StackHeader`] containing:
//! - Magic bytes and format version
//! - The element type tag from the codec
//! - CRC32 checksum of the above

use crate::common::config::{FORMAT_VERSION, HEADER_SIZE, MAGIC};
use crate::common::{Error, Result};

/// Metadata stored at offset 0 of a stack file.
///
/// # Layout (16 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     magic (b"DSTK")
/// 4       4     format_version (little-endian)
/// 8       4     type_tag (little-endian)
/// 12      4     checksum (CRC32 of bytes 0..12, little-endian)
/// ```
///
/// The header is written once when the file is created and never rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackHeader {
    pub magic: [u8; 4],
    pub format_version: u32,
    /// Element type descriptor from [`ValueCodec::type_tag`](crate::codec::ValueCodec::type_tag).
    pub type_tag: u32,
}

impl StackHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = HEADER_SIZE as usize;

    pub const OFFSET_MAGIC: usize = 0;
    pub const OFFSET_VERSION: usize = 4;
    pub const OFFSET_TYPE_TAG: usize = 8;
    pub const OFFSET_CHECKSUM: usize = 12;

    /// Create a header for the current format version.
    pub fn new(type_tag: u32) -> Self {
        Self {
            magic: MAGIC,
            format_version: FORMAT_VERSION,
            type_tag,
        }
    }

    /// Serialize to bytes, checksum included.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[Self::OFFSET_MAGIC..Self::OFFSET_VERSION].copy_from_slice(&self.magic);
        bytes[Self::OFFSET_VERSION..Self::OFFSET_TYPE_TAG]
            .copy_from_slice(&self.format_version.to_le_bytes());
        bytes[Self::OFFSET_TYPE_TAG..Self::OFFSET_CHECKSUM]
            .copy_from_slice(&self.type_tag.to_le_bytes());

        let checksum = Self::compute_checksum(&bytes);
        bytes[Self::OFFSET_CHECKSUM..].copy_from_slice(&checksum.to_le_bytes());
        bytes
    }

    /// Parse and integrity-check a header.
    ///
    /// # Errors
    /// Returns `Error::IncompatibleStore` on bad magic, checksum mismatch, or
    /// unsupported version. The type tag is checked separately by
    /// [`validate`](Self::validate).
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Result<Self> {
        let magic: [u8; 4] = read_array(bytes, Self::OFFSET_MAGIC);
        if magic != MAGIC {
            return Err(Error::IncompatibleStore(format!(
                "bad magic {:02x?}, expected {:02x?}",
                magic, MAGIC
            )));
        }

        let stored = u32::from_le_bytes(read_array(bytes, Self::OFFSET_CHECKSUM));
        let computed = Self::compute_checksum(bytes);
        if stored != computed {
            return Err(Error::IncompatibleStore(format!(
                "header checksum mismatch: stored {:#010x}, computed {:#010x}",
                stored, computed
            )));
        }

        let format_version = u32::from_le_bytes(read_array(bytes, Self::OFFSET_VERSION));
        if format_version != FORMAT_VERSION {
            return Err(Error::IncompatibleStore(format!(
                "unsupported format version {}, expected {}",
                format_version, FORMAT_VERSION
            )));
        }

        Ok(Self {
            magic,
            format_version,
            type_tag: u32::from_le_bytes(read_array(bytes, Self::OFFSET_TYPE_TAG)),
        })
    }

    /// Check the header was written for the expected element type.
    pub fn validate(&self, expected_type_tag: u32) -> Result<()> {
        if self.type_tag != expected_type_tag {
            return Err(Error::IncompatibleStore(format!(
                "element type tag {:#010x} does not match expected {:#010x}",
                self.type_tag, expected_type_tag
            )));
        }
        Ok(())
    }

    /// CRC32 over everything before the checksum field.
    pub fn compute_checksum(bytes: &[u8; Self::SIZE]) -> u32 {
        crc32fast::hash(&bytes[..Self::OFFSET_CHECKSUM])
    }
}

fn read_array(bytes: &[u8; StackHeader::SIZE], offset: usize) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(&bytes[offset..offset + 4]);
    out
}

// ============================================================================
// TESTS
// ============================================================================
