//! core
//!
//! Core domain types, schemas, and operations for doltrun.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, CommitRef, RunId, DatabaseName
//! - [`params`] - Run parameters validated at the engine boundary
//! - [`message`] - Commit message builders
//! - [`config`] - Configuration schema and loading
//! - [`lock`] - Host-local run lock
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Message building is deterministic

pub mod config;
pub mod lock;
pub mod message;
pub mod params;
pub mod types;
