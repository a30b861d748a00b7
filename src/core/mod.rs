//! Core functionality for palm-guard.
//!
//! This module contains:
//! - Device role resolution (which device is the keyboard, which the trackpad)
//! - The event gate deciding which trackpad events to drop

pub mod gate;
pub mod resolver;

// Re-export commonly used types
pub use gate::{Decision, EventGate, DEFAULT_SUPPRESSION_WINDOW, MAX_SUPPRESSION_WINDOW};
pub use resolver::{DeviceResolver, ResolveError, Role, Roles};
