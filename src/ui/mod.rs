//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All command output goes through this module so `--quiet` is honored
//! consistently. Diagnostics are `tracing` events, not output.

pub mod output;
