//! Report envelope: one stacktrace plus OS and package metadata.
//!
//! The envelope is what travels between machines, so it is the one place
//! with strict validation: an unrecognized `type` on the problem object is
//! a hard error, and the schema version is read-only.

use crate::model::stacktrace::Stacktrace;
use crate::utils::config::UREPORT_VERSION;
use crate::utils::error::{ParseError, ReportError};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Operating system descriptor carried alongside a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatingSystem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,

    /// Common Platform Enumeration identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpe: Option<String>,

    /// Seconds since boot at the time of the crash
    pub uptime: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub desktop: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

/// Role a package played in the problem
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageRole {
    /// Unknown, or known not to be the cause
    #[default]
    Unknown,
    /// Not affected by the problem
    Unaffected,
    /// The package the crash happened in
    Affected,
}

/// Installed package descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Package {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub epoch: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,

    pub install_time: u64,

    pub role: PackageRole,
}

/// Envelope around exactly one stacktrace variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    /// Envelope schema version; read-only, see [`Report::set_ureport_version`]
    ureport_version: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<OperatingSystem>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<Package>,

    /// The problem itself, tagged by report type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<Stacktrace>,
}

impl Default for Report {
    fn default() -> Self {
        Report {
            ureport_version: UREPORT_VERSION,
            operating_system: None,
            packages: Vec::new(),
            problem: None,
        }
    }
}

impl Report {
    pub fn new(problem: Stacktrace) -> Self {
        Report {
            problem: Some(problem),
            ..Default::default()
        }
    }

    /// Envelope schema version (derived, fixed by the library)
    pub fn ureport_version(&self) -> u32 {
        self.ureport_version
    }

    /// The schema version is derived from the library, not caller data.
    /// Always fails; kept so the immutability contract is explicit at the
    /// API surface rather than a silent no-op.
    pub fn set_ureport_version(&mut self, _version: u32) -> Result<(), ReportError> {
        Err(ReportError::ImmutableField("ureport_version"))
    }

    /// Parse a report from a JSON document
    pub fn from_json_text(input: &str) -> Result<Self, ParseError> {
        debug!("Parsing report from JSON ({} bytes)", input.len());
        Ok(serde_json::from_str(input)?)
    }

    pub fn to_json_text(&self) -> Result<String, ParseError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Write a report to a JSON file, creating parent directories if needed
pub fn write_report(report: &Report, output_path: impl AsRef<Path>) -> Result<(), ParseError> {
    let output_path = output_path.as_ref();

    info!("Writing report to: {}", output_path.display());

    if let Some(parent) = output_path.parent() {
        if !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(output_path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report)?;

    Ok(())
}

/// Read a report back from a JSON file
pub fn read_report(input_path: impl AsRef<Path>) -> Result<Report, ParseError> {
    let input_path = input_path.as_ref();

    debug!("Reading report from: {}", input_path.display());

    let file = File::open(input_path)?;
    let report: Report = serde_json::from_reader(file)?;

    Ok(report)
}
