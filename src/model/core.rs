//! Native core dump model.
//!
//! Multi-threaded variant produced by the unwinder. Frames are identified
//! by build id and offset when no symbol is available; the crash thread is
//! marked per-thread by the upstream parser (`crash_thread` key in JSON).

use crate::distance::FrameToken;
use crate::utils::config::{UNKNOWN_FUNCTION, UNKNOWN_VALUE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One frame of a core dump thread
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreFrame {
    /// Address of the machine code in memory. Useful mainly when build_id
    /// is absent (null dereference, jitted code).
    pub address: u64,

    /// Build id of the ELF binary the frame points into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,

    /// Offset of the instruction within the ELF section
    pub build_id_offset: u64,

    /// Symbol name, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,

    /// Path of the mapped binary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// Instruction-stream fingerprint of the function, if computed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl CoreFrame {
    /// Identity comparator input for the distance metrics
    pub fn distance_token(&self) -> FrameToken {
        FrameToken {
            symbol: self.identity_token(),
            component: self.file_name.clone(),
        }
    }

    /// Preferred identity: symbol, then build id + offset, then
    /// fingerprint, then raw address
    pub fn identity_token(&self) -> String {
        if let Some(name) = &self.function_name {
            return name.clone();
        }
        if let Some(build_id) = &self.build_id {
            return format!("{}+0x{:x}", build_id, self.build_id_offset);
        }
        if let Some(fingerprint) = &self.fingerprint {
            return format!("{}+0x{:x}", fingerprint, self.build_id_offset);
        }
        format!("0x{:x}", self.address)
    }

    pub fn append_bthash_text(&self, out: &mut String) {
        use std::fmt::Write;
        if self.address != 0 {
            let _ = write!(out, "0x{:x}, ", self.address);
        } else {
            out.push_str("<unknown>, ");
        }
        let _ = writeln!(
            out,
            "{}+0x{:x}, {}, {}",
            self.build_id.as_deref().unwrap_or(UNKNOWN_VALUE),
            self.build_id_offset,
            self.file_name.as_deref().unwrap_or(UNKNOWN_VALUE),
            self.fingerprint.as_deref().unwrap_or(UNKNOWN_VALUE),
        );
    }

    /// Identity line for the near-duplicate hash. Build id is the
    /// preferred deduplication mechanism.
    pub fn append_duphash_text(&self, out: &mut String) {
        use std::fmt::Write;
        if let Some(build_id) = &self.build_id {
            let _ = writeln!(out, "{}+0x{:x}", build_id, self.build_id_offset);
        } else if let Some(function_name) = &self.function_name {
            let _ = writeln!(out, "  {}", function_name);
        } else if let Some(fingerprint) = &self.fingerprint {
            let _ = writeln!(out, "{}+0x{:x}", fingerprint, self.build_id_offset);
        } else {
            let _ = writeln!(out, "0x{:x}", self.address);
        }
    }

    /// True when the frame carries no usable symbol
    pub fn has_unknown_function(&self) -> bool {
        match &self.function_name {
            Some(name) => name == UNKNOWN_FUNCTION,
            None => true,
        }
    }
}

impl fmt::Display for CoreFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.function_name {
            write!(f, "{}", name)?;
        } else {
            write!(
                f,
                "{}+{}",
                self.build_id.as_deref().unwrap_or(UNKNOWN_VALUE),
                self.build_id_offset
            )?;
        }
        if let Some(file_name) = &self.file_name {
            write!(f, " in {}", file_name)?;
        }
        Ok(())
    }
}

/// One thread of a core dump
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreThread {
    /// Call frames, crash point first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<CoreFrame>,

    /// Marker set by the unwinder on the faulting thread
    pub crash_thread: bool,
}

impl CoreThread {
    pub fn distance_tokens(&self) -> Vec<FrameToken> {
        self.frames.iter().map(CoreFrame::distance_token).collect()
    }
}

/// A parsed core dump: threads plus process-level metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreStacktrace {
    /// Signal that terminated the process
    pub signal: u16,

    /// Path of the crashed executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,

    /// All threads of the process
    #[serde(rename = "stacktrace", skip_serializing_if = "Vec::is_empty")]
    pub threads: Vec<CoreThread>,
}

impl CoreStacktrace {
    /// Thread marked as having triggered the fault, if any was marked
    pub fn find_crash_thread(&self) -> Option<&CoreThread> {
        self.threads.iter().find(|t| t.crash_thread)
    }

    /// Index used for display when no marker exists (thread 0 fallback)
    pub fn display_crash_thread_index(&self) -> usize {
        self.threads
            .iter()
            .position(|t| t.crash_thread)
            .unwrap_or(0)
    }
}
