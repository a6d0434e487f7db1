//! Kernel oops model.
//!
//! Single implicit thread. Carries kernel-specific metadata: version,
//! taint flags and the loaded module list. Frames distinguish reliable
//! entries from stack guesses (the `?` prefix in the raw oops).

use crate::distance::FrameToken;
use crate::utils::config::UNKNOWN_VALUE;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One frame of a kernel oops call trace
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct KoopsFrame {
    /// Address of the instruction
    pub address: u64,

    /// False when the kernel printed the frame with a `?` (stack guess)
    pub reliable: bool,

    /// Symbol name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,

    /// Offset into the function
    pub function_offset: u64,

    /// Length of the function
    pub function_length: u64,

    /// Module the symbol belongs to; absent for vmlinux
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,

    /// Caller address, when the oops printed a "from" entry
    pub from_address: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_function_name: Option<String>,

    pub from_function_offset: u64,

    pub from_function_length: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_module_name: Option<String>,
}

impl KoopsFrame {
    /// Identity comparator input for the distance metrics
    pub fn distance_token(&self) -> FrameToken {
        FrameToken {
            symbol: self.identity_token(),
            component: self.module_name.clone(),
        }
    }

    /// Symbol name, or the hex address when the symbol is unknown
    pub fn identity_token(&self) -> String {
        match &self.function_name {
            Some(name) => name.clone(),
            None => format!("0x{:x}", self.address),
        }
    }

    pub fn append_bthash_text(&self, out: &mut String) {
        use std::fmt::Write;
        let _ = writeln!(
            out,
            "0x{:x}, {}, {}, 0x{:x}, 0x{:x}, {}, 0x{:x}, {}, 0x{:x}, 0x{:x}, {}",
            self.address,
            self.reliable as u8,
            self.function_name.as_deref().unwrap_or(UNKNOWN_VALUE),
            self.function_offset,
            self.function_length,
            self.module_name.as_deref().unwrap_or(UNKNOWN_VALUE),
            self.from_address,
            self.from_function_name.as_deref().unwrap_or(UNKNOWN_VALUE),
            self.from_function_offset,
            self.from_function_length,
            self.from_module_name.as_deref().unwrap_or(UNKNOWN_VALUE),
        );
    }

    /// Identity line for the near-duplicate hash.
    ///
    /// In compatibility mode unreliable frames are skipped entirely, which
    /// matches the legacy external hashing convention.
    pub fn append_duphash_text(&self, out: &mut String, koops_compat: bool) {
        use std::fmt::Write;
        if koops_compat && !self.reliable {
            return;
        }
        match &self.function_name {
            Some(name) => {
                let _ = writeln!(out, "{}", name);
            }
            None => {
                let _ = writeln!(out, "0x{:x}", self.address);
            }
        }
    }
}

impl fmt::Display for KoopsFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            if self.reliable { "" } else { "? " },
            self.function_name.as_deref().unwrap_or("??")
        )?;
        if let Some(module_name) = &self.module_name {
            write!(f, " in {}", module_name)?;
        }
        Ok(())
    }
}

/// Kernel taint state at the time of the oops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KoopsTaintFlags {
    pub taint_module_proprietary: bool,
    pub taint_module_out_of_tree: bool,
    pub taint_forced_module: bool,
    pub taint_forced_removal: bool,
    pub taint_smp_unsafe: bool,
    pub taint_mce: bool,
    pub taint_page_release: bool,
    pub taint_userspace: bool,
    pub taint_died_recently: bool,
    pub taint_acpi_overridden: bool,
    pub taint_warning: bool,
    pub taint_staging_driver: bool,
    pub taint_firmware_workaround: bool,
}

impl KoopsTaintFlags {
    /// One-letter codes as printed by the kernel, in a fixed order
    pub fn letters(&self) -> String {
        let table = [
            (self.taint_module_proprietary, 'P'),
            (self.taint_forced_module, 'F'),
            (self.taint_smp_unsafe, 'S'),
            (self.taint_forced_removal, 'R'),
            (self.taint_mce, 'M'),
            (self.taint_page_release, 'B'),
            (self.taint_userspace, 'U'),
            (self.taint_died_recently, 'D'),
            (self.taint_acpi_overridden, 'A'),
            (self.taint_warning, 'W'),
            (self.taint_staging_driver, 'C'),
            (self.taint_firmware_workaround, 'I'),
            (self.taint_module_out_of_tree, 'O'),
        ];
        table
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, letter)| *letter)
            .collect()
    }
}

/// A parsed kernel oops (single implicit thread)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KoopsStacktrace {
    /// Version of the kernel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Taint flags reported in the oops
    #[serde(flatten)]
    pub taint_flags: KoopsTaintFlags,

    /// Loaded modules; sometimes not included in the oops
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,

    /// Call trace, crash point first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<KoopsFrame>,
}

impl KoopsStacktrace {
    pub fn distance_tokens(&self) -> Vec<FrameToken> {
        self.frames.iter().map(KoopsFrame::distance_token).collect()
    }
}
