//! Error types for diskstack.

use std::path::PathBuf;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
/// This is a common Rust pattern (see `std::io::Result`).
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in diskstack.
///
/// Emptiness is not represented here: a pop on an empty stack returns
/// `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing file could not be created, opened, or initialized.
    #[error("failed to open stack file {path:?}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An existing file's header does not match this format or element type.
    ///
    /// Never auto-repaired.
    #[error("incompatible stack file: {0}")]
    IncompatibleStore(String),

    /// I/O error from a push, pop, or sync.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload bytes do not decode to the element type, or a frame's
    /// length markers disagree.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    /// A frame claims more bytes than the file holds.
    #[error("truncated frame at offset {offset}: need {needed} bytes, {available} available")]
    TruncatedFrame {
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// A value could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// The handle was closed.
    #[error("stack handle is closed")]
    HandleClosed,

    /// A previous write failed and could not be rolled back.
    ///
    /// The file must be reopened so it can be re-scanned.
    #[error("stack is degraded after a failed write; reopen to recover")]
    Degraded,

    /// Attempted to truncate outside the live record region.
    ///
    /// This indicates a bug - truncation always follows a tail read.
    #[error("invalid truncate to {requested} bytes (current size {current})")]
    InvalidTruncate { requested: u64, current: u64 },

    /// A [`StackConfig`](crate::StackConfig) failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
