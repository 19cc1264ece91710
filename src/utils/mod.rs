//! Utility functions and helpers
//!
//! Application paths and the logging setup shared by the library and the binary.

pub mod app_paths;
pub mod logging;
