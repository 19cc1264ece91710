//! External API clients
//!
//! HTTP implementations of the collaborator traits in
//! [`crate::data::data_provider`].

pub mod analytics;
pub mod client;

pub use analytics::AnalyticsSink;
pub use client::RestProvider;
