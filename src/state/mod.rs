//! State management components
//!
//! The navigation controller owns the only shared mutable state: the active
//! selection and the table snapshot shown for it.

pub mod navigation;

pub use navigation::{NavPhase, NavState, NavigationController, NavigationDefaults, Transition};
