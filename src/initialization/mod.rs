//! Application initialization and resource setup.
//!
//! This module provides functions to initialize shared resources:
//! - Logger (plain or JSON)
//! - HTTP client for the Databricks API
//! - Warehouse backend selected by the configuration
//!
//! All initialization functions return `InitializationError` on failure.

mod client;
mod logger;
mod warehouse;

// Re-export public API
pub use client::init_client;
pub use logger::init_logger_with;
pub use warehouse::init_warehouse;
