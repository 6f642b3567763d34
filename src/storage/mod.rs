//! Storage layer - file I/O and on-disk formats.
//!
//! This module handles persistent storage:
//! - [`FileStore`] - Low-level append / read-tail / truncate
//! - [`header`] - The fixed file header
//! - [`frame`] - Bidirectional record framing

mod file_store;
pub mod frame;
pub mod header;

pub use file_store::{FileStore, Recovered};
#[cfg(test)]
pub(crate) use file_store::Faults;
pub use frame::{FrameMarkers, RawFrame};
pub use header::StackHeader;
