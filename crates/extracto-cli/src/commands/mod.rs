//! CLI command implementations
//!
//! - `convert` - Statement to QIF conversion

pub mod convert;

// Re-export command functions for main.rs
pub use convert::*;
