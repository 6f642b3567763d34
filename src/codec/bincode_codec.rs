//! Serde-based codec for arbitrary structured values.

use std::fmt;
use std::marker::PhantomData;

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::ValueCodec;
use crate::common::{Error, Result};

/// Encodes any `serde` type with bincode.
///
/// Integers are fixed-width little-endian and trailing bytes are rejected,
/// so a payload of the wrong length never decodes silently.
///
/// # Example
/// ```
/// use diskstack::codec::{BincodeCodec, ValueCodec};
///
/// let codec = BincodeCodec::<(u32, String)>::new();
/// let bytes = codec.encode(&(7, "seven".to_string())).unwrap();
/// assert_eq!(codec.decode(&bytes).unwrap(), (7, "seven".to_string()));
/// ```
pub struct BincodeCodec<T> {
    _marker: PhantomData<fn(T) -> T>,
}

impl<T> BincodeCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    fn options() -> impl Options {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_little_endian()
            .reject_trailing_bytes()
    }
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BincodeCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BincodeCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BincodeCodec<{}>", std::any::type_name::<T>())
    }
}

impl<T> ValueCodec<T> for BincodeCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        Self::options()
            .serialize(value)
            .map_err(|e| Error::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        Self::options().deserialize(bytes).map_err(|e| {
            Error::CorruptPayload(format!(
                "{} bytes do not decode as {}: {}",
                bytes.len(),
                std::any::type_name::<T>(),
                e
            ))
        })
    }

    fn codec_id(&self) -> &str {
        "bincode-fixint"
    }
}
