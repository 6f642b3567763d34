//! Common types and utilities shared across diskstack.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Format constants and [`StackConfig`](config::StackConfig)
//! - Error types

pub mod config;
pub mod error;

pub use error::{Error, Result};
