//! Stack facade.
//!
//! # Components
//! - [`DiskStack`] - The public push/pop handle
//! - [`StackStats`] - Operation statistics

mod disk_stack;
mod stats;

pub use disk_stack::DiskStack;
pub use stats::{StackStats, StatsSnapshot};
