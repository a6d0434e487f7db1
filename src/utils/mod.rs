//! Shared error types and constants.

pub mod config;
pub mod error;
