//! Format constants and runtime configuration for diskstack.

use crate::common::{Error, Result};

/// Magic bytes at the start of every stack file.
pub const MAGIC: [u8; 4] = *b"DSTK";

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Size of the file header in bytes.
///
/// This is also the byte size of a freshly created, empty stack.
pub const HEADER_SIZE: u64 = 16;

/// Size of one length marker in a frame.
pub const LEN_FIELD_SIZE: u64 = 8;

/// Bytes a frame adds around its payload (leading + trailing length).
pub const FRAME_OVERHEAD: u64 = 2 * LEN_FIELD_SIZE;

/// Default upper bound on a single encoded payload (256 MiB).
pub const DEFAULT_MAX_PAYLOAD_LEN: u64 = 256 * 1024 * 1024;

/// Runtime options for opening a stack.
///
/// # Example
/// ```
/// use diskstack::StackConfig;
///
/// let config = StackConfig::new()
///     .with_sync_writes(true)
///     .with_repair_torn_tail(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    /// fsync after every append and truncate (default: false).
    ///
    /// `close()` always syncs regardless of this flag.
    pub sync_writes: bool,

    /// On open, cut an incomplete trailing frame instead of failing
    /// (default: true).
    pub repair_torn_tail: bool,

    /// Largest payload a frame may carry (default: 256 MiB).
    pub max_payload_len: u64,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            sync_writes: false,
            repair_torn_tail: true,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}

impl StackConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fsync-per-mutation flag (builder pattern).
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Set torn-tail repair on open (builder pattern).
    pub fn with_repair_torn_tail(mut self, repair: bool) -> Self {
        self.repair_torn_tail = repair;
        self
    }

    /// Set the payload size limit (builder pattern).
    pub fn with_max_payload_len(mut self, len: u64) -> Self {
        self.max_payload_len = len;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_payload_len == 0 {
            return Err(Error::InvalidConfig(
                "max_payload_len must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
