//! Data layer: entities, snapshots and the collaborator traits
//!
//! This module holds the in-memory projection of the remote store and the
//! pure policies applied to it.

// Core data modules
pub mod data_provider;
pub mod model;
pub mod snapshot;

// Policies and export
pub mod column_order;
pub mod data_exporter;
