//! Value codecs - converting elements to payload bytes and back.
//!
//! Every element pushed onto a stack passes through a [`ValueCodec`]. The
//! codec's [`type_tag`](ValueCodec::type_tag) is stored in the file header,
//! so a file written with one element type or codec is rejected when reopened
//! with another.
//!
//! # Implementations
//! - [`BincodeCodec`] - any `serde` type (the default)
//! - [`FixedWidthCodec`] - primitive numerics as raw little-endian bytes

mod bincode_codec;
mod fixed_width;

pub use bincode_codec::BincodeCodec;
pub use fixed_width::{FixedWidth, FixedWidthCodec};

use crate::common::Result;

/// Encodes and decodes values of element type `T`.
///
/// # Contract
/// - `decode(&encode(v)?)? == v` for every representable `v`
/// - `encode` is deterministic
/// - `decode` returns [`Error::CorruptPayload`](crate::Error::CorruptPayload)
///   when the bytes are inconsistent with `T`, never a wrong value
///
/// Codecs must be `Send + Sync` so a stack can be shared between threads.
pub trait ValueCodec<T>: Send + Sync {
    /// Encode a value into a self-contained payload.
    fn encode(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode a payload produced by [`encode`](Self::encode).
    fn decode(&self, bytes: &[u8]) -> Result<T>;

    /// Unique codec identifier.
    fn codec_id(&self) -> &str;

    /// Element-type descriptor written into the file header.
    ///
    /// Defaults to a CRC32 of `"<codec_id>:<type name>"`. Type names come
    /// from [`std::any::type_name`], which is not guaranteed stable across
    /// compiler releases; override this for files that must outlive a
    /// toolchain upgrade.
    fn type_tag(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(self.codec_id().as_bytes());
        hasher.update(b":");
        hasher.update(std::any::type_name::<T>().as_bytes());
        hasher.finalize()
    }
}
