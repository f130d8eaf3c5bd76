//! doltrun - Branch-and-commit lifecycle for pipeline runs on a Dolt database
//!
//! A pipeline run is bracketed by two hooks. Before the run, the database is
//! switched onto the branch the run asked for (creating it if needed). After
//! the run, whatever the pipeline wrote is committed with a message naming
//! the run, and the database is put back on the branch it started on. Every
//! dataset written by a run is thereby tied to a commit that can be found
//! again from the run id.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Lifecycle controller and the hooks a workflow engine drives
//! - [`core`] - Domain types, run parameters, messages, config, run lock
//! - [`store`] - Single interface for all versioned-store operations
//! - [`ui`] - User-facing output
//! - [`logging`] - Tracing subscriber setup for the binary
//!
//! # Correctness Invariants
//!
//! 1. A run's writes are committed before the original branch is restored
//! 2. The restore is attempted even when the commit fails
//! 3. A failed restore is always reported, never swallowed
//! 4. An empty working set is not an error

pub mod cli;
pub mod core;
pub mod engine;
pub mod logging;
pub mod store;
pub mod ui;
