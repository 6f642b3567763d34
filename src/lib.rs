//! diskstack - a persistent, file-backed LIFO stack.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           diskstack                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Stack Facade (stack/)                       │   │
//! │  │   DiskStack: open / push / pop / size / len / close      │   │
//! │  │         one Mutex per handle + Condvar + stats           │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Value Codec (codec/)                        │   │
//! │  │        BincodeCodec (serde)  |  FixedWidthCodec          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                    │   │
//! │  │   FileStore + StackHeader + frame [len|payload|len]      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # File Format
//! ```text
//! [ Header: magic | version | type_tag | crc32 ]   16 bytes
//! [ len(8) | payload | len(8) ]                    record 1
//! ...
//! [ len(8) | payload | len(8) ]                    record N  <- tail
//! ```
//!
//! A push appends one frame; a pop reads the trailing length, reads the
//! frame behind it, and truncates the file. An empty stack is exactly
//! [`HEADER_SIZE`] bytes on disk.
//!
//! # Modules
//! - [`common`] - Shared primitives (Error, config, format constants)
//! - [`codec`] - Value encoding
//! - [`storage`] - File I/O and on-disk formats
//! - [`stack`] - The public stack handle
//!
//! # Quick Start
//! ```no_run
//! use diskstack::DiskStack;
//!
//! let stack: DiskStack<String> = DiskStack::open("jobs.stack").unwrap();
//! stack.push(&"index".to_string()).unwrap();
//!
//! while let Some(job) = stack.pop().unwrap() {
//!     println!("{}", job);
//! }
//! ```

pub mod codec;
pub mod common;
pub mod stack;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{StackConfig, FRAME_OVERHEAD, HEADER_SIZE};
pub use common::{Error, Result};

pub use codec::{BincodeCodec, FixedWidthCodec, ValueCodec};
pub use stack::{DiskStack, StatsSnapshot};
