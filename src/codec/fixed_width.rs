//! Raw little-endian codec for primitive numeric types.

use std::fmt;
use std::marker::PhantomData;

use crate::codec::ValueCodec;
use crate::common::{Error, Result};

/// A primitive with a fixed-size little-endian byte representation.
pub trait FixedWidth: Copy + Send + Sync + 'static {
    /// Encoded size in bytes.
    const WIDTH: usize;

    fn write_le(self, out: &mut Vec<u8>);

    /// Read from exactly [`WIDTH`](Self::WIDTH) bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_fixed_width {
    ($($t:ty),* $(,)?) => {
        $(
            impl FixedWidth for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(bytes);
                    <$t>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_fixed_width!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64);

/// Stores numerics as exactly `T::WIDTH` little-endian bytes.
///
/// The most compact encoding for numeric stacks. Any payload whose length is
/// not `T::WIDTH` is rejected as corrupt.
pub struct FixedWidthCodec<T> {
    _marker: PhantomData<fn(T) -> T>,
}

impl<T> FixedWidthCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for FixedWidthCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for FixedWidthCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FixedWidthCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedWidthCodec<{}>", std::any::type_name::<T>())
    }
}

impl<T: FixedWidth> ValueCodec<T> for FixedWidthCodec<T> {
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(T::WIDTH);
        (*value).write_le(&mut out);
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        if bytes.len() != T::WIDTH {
            return Err(Error::CorruptPayload(format!(
                "expected {} bytes for {}, got {}",
                T::WIDTH,
                std::any::type_name::<T>(),
                bytes.len()
            )));
        }
        Ok(T::read_le(bytes))
    }

    fn codec_id(&self) -> &str {
        "fixed-le"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_widths() {
        assert_eq!(<u8 as FixedWidth>::WIDTH, 1);
        assert_eq!(<i32 as FixedWidth>::WIDTH, 4);
        assert_eq!(<f64 as FixedWidth>::WIDTH, 8);
        assert_eq!(<u128 as FixedWidth>::WIDTH, 16);
    }

    #[test]
    fn test_byte_layout() {
        let codec = FixedWidthCodec::<u32>::new();
        assert_eq!(codec.encode(&0x04030201).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_wrong_length_is_corrupt() {
        let codec = FixedWidthCodec::<u64>::new();
        assert!(matches!(codec.decode(&[0; 7]), Err(Error::CorruptPayload(_))));
        assert!(matches!(codec.decode(&[0; 9]), Err(Error::CorruptPayload(_))));
        assert!(matches!(codec.decode(&[]), Err(Error::CorruptPayload(_))));
    }

    #[test]
    fn test_float_bits_preserved() {
        let codec = FixedWidthCodec::<f64>::new();
        let bytes = codec.encode(&f64::NEG_INFINITY).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), f64::NEG_INFINITY);

        let nan = codec.decode(&codec.encode(&f64::NAN).unwrap()).unwrap();
        assert!(nan.is_nan());
    }

    proptest! {
        #[test]
        fn prop_i64_roundtrip(v in any::<i64>()) {
            let codec = FixedWidthCodec::<i64>::new();
            prop_assert_eq!(codec.decode(&codec.encode(&v).unwrap()).unwrap(), v);
        }
    }
}
