//! Unified stack-trace data model.
//!
//! One module per crash-source variant, plus the closed `Stacktrace` enum
//! that ties them together and the report envelope. All structures are
//! value-like aggregates: `Clone` yields a fully independent deep copy.

pub mod core;
pub mod gdb;
pub mod koops;
pub mod python;
pub mod report;
pub mod ruby;
pub mod stacktrace;
