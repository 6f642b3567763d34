//! Record framing.
//!
//! A frame wraps one encoded element with its length on both sides:
//!
//! ```text
//! ┌──────────────┬─────────────────────┬──────────────┐
//! │ len (8, LE)  │ payload (len bytes) │ len (8, LE)  │
//! └──────────────┴─────────────────────┴──────────────┘
//! ```
//!
//! The leading length lets a scan walk the file forward from the header.
//! The trailing length lets a pop find the last frame from the end of the
//! file without an index.

use std::io::{Read, Seek, SeekFrom};

use crate::common::config::{FRAME_OVERHEAD, LEN_FIELD_SIZE};
use crate::common::{Error, Result};

/// A payload read back from disk, with the size of the frame it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub payload: Vec<u8>,
    /// `payload.len() + FRAME_OVERHEAD`.
    pub frame_size: u64,
}

/// Total on-disk size of a frame carrying `payload_len` bytes.
#[inline]
pub fn frame_size(payload_len: u64) -> u64 {
    payload_len.saturating_add(FRAME_OVERHEAD)
}

/// Wrap a payload as `[len][payload][len]`.
pub fn wrap(payload: &[u8]) -> Vec<u8> {
    let len = (payload.len() as u64).to_le_bytes();
    let mut frame = Vec::with_capacity(payload.len() + FRAME_OVERHEAD as usize);
    frame.extend_from_slice(&len);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&len);
    frame
}

/// The two length markers of one frame, read without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMarkers {
    pub leading: u64,
    pub trailing: u64,
}

impl FrameMarkers {
    /// Size of the frame as claimed by its leading marker.
    #[inline]
    pub fn frame_size(&self) -> u64 {
        frame_size(self.leading)
    }

    /// Frame size if both markers agree.
    ///
    /// # Errors
    /// `Error::CorruptPayload` naming `start` when they disagree.
    pub fn check(&self, start: u64) -> Result<u64> {
        if self.leading != self.trailing {
            return Err(mismatch(start, self.leading, self.trailing));
        }
        Ok(self.frame_size())
    }
}

/// Read the markers of the frame starting at `start`, moving forward.
///
/// `end` is the first offset past the readable region; the frame must fit
/// entirely below it. The payload is seeked over, not read, so a scan costs
/// two small reads per frame whatever the payload size.
///
/// Marker agreement is left to the caller ([`FrameMarkers::check`]): a
/// mismatch on the last frame of a file is a torn write, anywhere else it is
/// corruption.
///
/// # Errors
/// - `Error::TruncatedFrame` if fewer bytes remain than the length implies
/// - `Error::CorruptPayload` if the length exceeds `max_payload_len`
pub fn unwrap_forward<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    end: u64,
    max_payload_len: u64,
) -> Result<FrameMarkers> {
    let available = end.saturating_sub(start);
    if available < LEN_FIELD_SIZE {
        return Err(Error::TruncatedFrame {
            offset: start,
            needed: LEN_FIELD_SIZE,
            available,
        });
    }

    reader.seek(SeekFrom::Start(start))?;
    let leading = read_len(reader)?;
    check_limit(leading, start, max_payload_len)?;

    let needed = frame_size(leading);
    if available < needed {
        return Err(Error::TruncatedFrame {
            offset: start,
            needed,
            available,
        });
    }

    reader.seek(SeekFrom::Start(start + needed - LEN_FIELD_SIZE))?;
    let trailing = read_len(reader)?;

    Ok(FrameMarkers { leading, trailing })
}

/// Read the frame that ends exactly at `end`, moving backward.
///
/// `floor` is the lowest offset a frame may start at (the header size).
/// Costs two reads regardless of how many frames precede it.
///
/// # Errors
/// Same as [`unwrap_forward`].
pub fn unwrap_backward<R: Read + Seek>(
    reader: &mut R,
    end: u64,
    floor: u64,
    max_payload_len: u64,
) -> Result<RawFrame> {
    let available = end.saturating_sub(floor);
    if available < FRAME_OVERHEAD {
        return Err(Error::TruncatedFrame {
            offset: floor,
            needed: FRAME_OVERHEAD,
            available,
        });
    }

    reader.seek(SeekFrom::Start(end - LEN_FIELD_SIZE))?;
    let len = read_len(reader)?;
    check_limit(len, end - LEN_FIELD_SIZE, max_payload_len)?;

    let needed = frame_size(len);
    if available < needed {
        return Err(Error::TruncatedFrame {
            offset: floor,
            needed,
            available,
        });
    }

    let start = end - needed;
    reader.seek(SeekFrom::Start(start))?;
    let mut frame = vec![0u8; needed as usize];
    reader.read_exact(&mut frame)?;

    let leading = decode_len(&frame[..LEN_FIELD_SIZE as usize]);
    if leading != len {
        return Err(mismatch(start, leading, len));
    }

    // Drop the trailing marker, then the leading one.
    frame.truncate(frame.len() - LEN_FIELD_SIZE as usize);
    frame.drain(..LEN_FIELD_SIZE as usize);

    Ok(RawFrame {
        payload: frame,
        frame_size: needed,
    })
}

fn read_len<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; LEN_FIELD_SIZE as usize];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn decode_len(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; LEN_FIELD_SIZE as usize];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

fn check_limit(len: u64, offset: u64, max_payload_len: u64) -> Result<()> {
    if len > max_payload_len {
        return Err(Error::CorruptPayload(format!(
            "length marker at offset {} claims {} bytes, limit is {}",
            offset, len, max_payload_len
        )));
    }
    Ok(())
}

fn mismatch(start: u64, leading: u64, trailing: u64) -> Error {
    Error::CorruptPayload(format!(
        "frame at offset {}: leading length {} != trailing length {}",
        start, leading, trailing
    ))
}

// ============================================================================
// TESTS
// ============================================================================
