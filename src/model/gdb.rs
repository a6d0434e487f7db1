//! Debugger (GDB) backtrace model.
//!
//! Multi-threaded variant. Frames carry symbol, source location, library
//! and the `signal_handler_called` marker; the unknown symbol is the
//! literal `"??"`.

use crate::distance::FrameToken;
use crate::utils::config::{UNKNOWN_FUNCTION, UNKNOWN_VALUE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One frame of a debugger backtrace
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct GdbFrame {
    /// Function name, `"??"` when the debugger could not resolve it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,

    /// Function return type, rarely present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_type: Option<String>,

    /// Frame number as printed by the debugger (display only)
    pub number: u32,

    /// Source file of the function
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,

    /// Line in the source file
    pub source_line: u32,

    /// True for the synthetic "<signal handler called>" frame
    pub signal_handler_called: bool,

    /// Address of the instruction
    pub address: u64,

    /// Shared library the instruction belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_name: Option<String>,
}

impl GdbFrame {
    /// True when the symbol is missing or the `"??"` placeholder
    pub fn has_unknown_function(&self) -> bool {
        match &self.function_name {
            Some(name) => name == UNKNOWN_FUNCTION,
            None => true,
        }
    }

    /// Identity comparator input for the distance metrics
    pub fn distance_token(&self) -> FrameToken {
        FrameToken {
            symbol: self
                .function_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_FUNCTION.to_string()),
            component: self.library_name.clone(),
        }
    }

    /// Canonical full-hash line, one per frame
    pub fn append_bthash_text(&self, out: &mut String) {
        use std::fmt::Write;
        let _ = writeln!(
            out,
            "{}, {}, {}, {}, {}, {}, 0x{:x}, {}",
            self.function_name.as_deref().unwrap_or(UNKNOWN_VALUE),
            self.function_type.as_deref().unwrap_or(UNKNOWN_VALUE),
            self.number,
            self.source_file.as_deref().unwrap_or(UNKNOWN_VALUE),
            self.source_line,
            self.signal_handler_called as u8,
            self.address,
            self.library_name.as_deref().unwrap_or(UNKNOWN_VALUE),
        );
    }

    /// Identity line for the near-duplicate hash
    pub fn append_duphash_text(&self, out: &mut String) {
        out.push(' ');
        if let Some(function_type) = &self.function_type {
            out.push(' ');
            out.push_str(function_type);
        }
        if let Some(function_name) = &self.function_name {
            out.push(' ');
            out.push_str(function_name);
        }
        if self.signal_handler_called {
            out.push_str(" <signal handler called>");
        }
        out.push('\n');
    }
}

impl fmt::Display for GdbFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.signal_handler_called {
            return write!(f, "<signal handler called>");
        }
        write!(
            f,
            "{}",
            self.function_name.as_deref().unwrap_or(UNKNOWN_FUNCTION)
        )?;
        if let Some(source_file) = &self.source_file {
            write!(f, " at {}:{}", source_file, self.source_line)?;
        }
        if let Some(library_name) = &self.library_name {
            write!(f, " from {}", library_name)?;
        }
        Ok(())
    }
}

/// One thread of a debugger backtrace, frames ordered innermost first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GdbThread {
    /// Thread number as printed by the debugger (display only)
    pub number: u32,

    /// Call frames, crash point first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<GdbFrame>,
}

impl GdbThread {
    /// Identity comparator inputs for all frames, in call order
    pub fn distance_tokens(&self) -> Vec<FrameToken> {
        self.frames.iter().map(GdbFrame::distance_token).collect()
    }
}

/// A parsed debugger session: threads plus the parser's crash-thread marker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GdbStacktrace {
    /// All threads in the session
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub threads: Vec<GdbThread>,

    /// Index of the thread the debugger reported as faulting.
    /// Set by the upstream parser; never re-derived here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crash_thread: Option<usize>,
}

impl GdbStacktrace {
    /// Thread marked as having triggered the fault, if any was marked
    pub fn find_crash_thread(&self) -> Option<&GdbThread> {
        self.crash_thread.and_then(|i| self.threads.get(i))
    }

    /// Index used for display when no marker exists (thread 0 fallback)
    pub fn display_crash_thread_index(&self) -> usize {
        self.crash_thread.unwrap_or(0)
    }
}
