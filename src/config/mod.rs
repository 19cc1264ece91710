//! Configuration module
//!
//! Settings file, environment overrides and the mapping from settings to
//! the core's option types.

pub mod config;

pub use config::Config;
