//! The closed set of stacktrace variants and operations common to all.
//!
//! Modeled as a tagged enum rather than a class hierarchy: each variant's
//! extra fields live behind the tag and are touched only by variant-aware
//! code (normalization, hashing, rendering).

use crate::model::core::CoreStacktrace;
use crate::model::gdb::GdbStacktrace;
use crate::model::koops::KoopsStacktrace;
use crate::model::python::PythonStacktrace;
use crate::model::ruby::RubyStacktrace;
use crate::utils::error::ParseError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

/// Report type tag, one per crash-source kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Core,
    Gdb,
    Python,
    Ruby,
    Kerneloops,
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportType::Core => "core",
            ReportType::Gdb => "gdb",
            ReportType::Python => "python",
            ReportType::Ruby => "ruby",
            ReportType::Kerneloops => "kerneloops",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ReportType {
    type Err = crate::utils::error::ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core" => Ok(ReportType::Core),
            "gdb" => Ok(ReportType::Gdb),
            "python" => Ok(ReportType::Python),
            "ruby" => Ok(ReportType::Ruby),
            "kerneloops" => Ok(ReportType::Kerneloops),
            other => Err(crate::utils::error::ReportError::InvalidReportType(
                other.to_string(),
            )),
        }
    }
}

/// A stacktrace of any supported variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Stacktrace {
    Core(CoreStacktrace),
    Gdb(GdbStacktrace),
    Python(PythonStacktrace),
    Ruby(RubyStacktrace),
    Kerneloops(KoopsStacktrace),
}

impl Stacktrace {
    pub fn report_type(&self) -> ReportType {
        match self {
            Stacktrace::Core(_) => ReportType::Core,
            Stacktrace::Gdb(_) => ReportType::Gdb,
            Stacktrace::Python(_) => ReportType::Python,
            Stacktrace::Ruby(_) => ReportType::Ruby,
            Stacktrace::Kerneloops(_) => ReportType::Kerneloops,
        }
    }

    /// Parse a stacktrace of a known type from a JSON document.
    ///
    /// Field-level leniency is handled by the model structs (absent fields
    /// default, unknown keys are ignored); only a structurally invalid
    /// document is an error.
    pub fn from_json_text(report_type: ReportType, input: &str) -> Result<Self, ParseError> {
        debug!("Parsing {} stacktrace from JSON", report_type);
        let stacktrace = match report_type {
            ReportType::Core => Stacktrace::Core(serde_json::from_str(input)?),
            ReportType::Gdb => Stacktrace::Gdb(serde_json::from_str(input)?),
            ReportType::Python => Stacktrace::Python(serde_json::from_str(input)?),
            ReportType::Ruby => Stacktrace::Ruby(serde_json::from_str(input)?),
            ReportType::Kerneloops => Stacktrace::Kerneloops(serde_json::from_str(input)?),
        };
        Ok(stacktrace)
    }

    /// Serialize back to JSON (round-trips to an equal structure)
    pub fn to_json_text(&self) -> Result<String, ParseError> {
        let text = match self {
            Stacktrace::Core(s) => serde_json::to_string_pretty(s)?,
            Stacktrace::Gdb(s) => serde_json::to_string_pretty(s)?,
            Stacktrace::Python(s) => serde_json::to_string_pretty(s)?,
            Stacktrace::Ruby(s) => serde_json::to_string_pretty(s)?,
            Stacktrace::Kerneloops(s) => serde_json::to_string_pretty(s)?,
        };
        Ok(text)
    }

    /// Number of threads (1 for single-thread-sequence variants)
    pub fn thread_count(&self) -> usize {
        match self {
            Stacktrace::Core(s) => s.threads.len(),
            Stacktrace::Gdb(s) => s.threads.len(),
            _ => 1,
        }
    }

    /// Total number of frames across all threads
    pub fn frame_count(&self) -> usize {
        match self {
            Stacktrace::Core(s) => s.threads.iter().map(|t| t.frames.len()).sum(),
            Stacktrace::Gdb(s) => s.threads.iter().map(|t| t.frames.len()).sum(),
            Stacktrace::Python(s) => s.frames.len(),
            Stacktrace::Ruby(s) => s.frames.len(),
            Stacktrace::Kerneloops(s) => s.frames.len(),
        }
    }

    /// Distance-metric token sequence of the crash thread (display
    /// fallback: thread 0)
    pub fn crash_thread_tokens(&self) -> Vec<crate::distance::FrameToken> {
        match self {
            Stacktrace::Core(s) => s
                .threads
                .get(s.display_crash_thread_index())
                .map(|t| t.distance_tokens())
                .unwrap_or_default(),
            Stacktrace::Gdb(s) => s
                .threads
                .get(s.display_crash_thread_index())
                .map(|t| t.distance_tokens())
                .unwrap_or_default(),
            Stacktrace::Python(s) => s.distance_tokens(),
            Stacktrace::Ruby(s) => s.distance_tokens(),
            Stacktrace::Kerneloops(s) => s.distance_tokens(),
        }
    }

    /// Fixed, numbered, human-readable rendering.
    ///
    /// Starts with the crash thread; once it is exhausted, continues into
    /// subsequent threads under a "Thread no. N" header until `max_frames`
    /// total frames were printed. `max_frames == 0` means no limit.
    pub fn to_short_text(&self, max_frames: usize) -> String {
        match self {
            Stacktrace::Core(s) => {
                let lines: Vec<Vec<String>> = s
                    .threads
                    .iter()
                    .map(|t| t.frames.iter().map(|f| f.to_string()).collect())
                    .collect();
                short_text(&lines, s.display_crash_thread_index(), max_frames)
            }
            Stacktrace::Gdb(s) => {
                let lines: Vec<Vec<String>> = s
                    .threads
                    .iter()
                    .map(|t| t.frames.iter().map(|f| f.to_string()).collect())
                    .collect();
                short_text(&lines, s.display_crash_thread_index(), max_frames)
            }
            Stacktrace::Python(s) => {
                let lines = vec![s.frames.iter().map(|f| f.to_string()).collect()];
                short_text(&lines, 0, max_frames)
            }
            Stacktrace::Ruby(s) => {
                let lines = vec![s.frames.iter().map(|f| f.to_string()).collect()];
                short_text(&lines, 0, max_frames)
            }
            Stacktrace::Kerneloops(s) => {
                let lines = vec![s.frames.iter().map(|f| f.to_string()).collect()];
                short_text(&lines, 0, max_frames)
            }
        }
    }
}

/// Render numbered frame lines starting at the crash thread, spilling the
/// remaining frame budget into the threads after it.
fn short_text(threads: &[Vec<String>], crash_index: usize, max_frames: usize) -> String {
    let mut out = String::new();
    let mut printed = 0usize;

    let order = std::iter::once(crash_index)
        .chain((0..threads.len()).filter(|&i| i != crash_index && i > crash_index))
        .collect::<Vec<_>>();

    for (position, &thread_index) in order.iter().enumerate() {
        let Some(frame_lines) = threads.get(thread_index) else {
            continue;
        };
        if position > 0 {
            let _ = writeln!(out, "Thread no. {}", thread_index);
        }
        for line in frame_lines {
            printed += 1;
            let _ = writeln!(out, "#{} {}", printed, line);
            if max_frames != 0 && printed >= max_frames {
                return out;
            }
        }
    }

    out
}
