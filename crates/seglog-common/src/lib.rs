//! Seglog Common - Shared types and utilities
//!
//! This crate provides the error type, configuration structures and
//! buffer/profile types shared by the segment file layer and its tools.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AllocationMode, FsConfig, ProbeConfig};
pub use error::{Error, ErrorKind, Result};
pub use types::{BufferSet, CapabilityProfile, ReadStatus};
