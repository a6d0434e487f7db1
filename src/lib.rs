//! Crash report deduplication library
//!
//! Reduces parsed crash reports (core dumps, GDB backtraces, Python/Ruby
//! tracebacks, kernel oopses) into a normalized, comparable form: canonical
//! hashes for exact and near-duplicate detection, and pairwise distance
//! matrices for similarity clustering.

pub mod distance;
pub mod hash;
pub mod model;
pub mod normalize;
pub mod utils;

pub use distance::matrix::{compute_all_parts, merge_parts, DistanceMatrix, MatrixPart, MatrixPartitioner};
pub use distance::{DistanceMetric, FrameToken};
pub use hash::{bthash, duphash, BthashFlags, DuphashFlags};
pub use model::report::Report;
pub use model::stacktrace::{ReportType, Stacktrace};
pub use normalize::normalize;
