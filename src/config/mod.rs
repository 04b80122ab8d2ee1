//! Configuration Module
//!
//! Handles loading, defaults, and validation of the TOML config file.

mod types;

pub use types::*;
