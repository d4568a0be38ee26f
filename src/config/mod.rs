//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (defaults, limits, fixed table and column names)
//! - CLI option types and parsing
//! - The library-facing `Config`

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{
    Command, Config, ConnectionArgs, ExportArgs, FailurePolicy, LogFormat, LogLevel, Opt,
    WarehouseConfig, WarehouseTarget,
};
