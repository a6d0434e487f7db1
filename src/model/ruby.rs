//! Ruby exception backtrace model.
//!
//! Single implicit thread. Ruby nests blocks and rescue handlers inside
//! methods; the nesting depths are part of frame identity for equality but
//! not for the near-duplicate hash. Like the Python variant, the
//! `special_function` flag is encoded on the wire by key choice: the name
//! is written under `special_function` instead of `function_name`.

use crate::distance::FrameToken;
use crate::utils::config::{UNKNOWN_FUNCTION, UNKNOWN_VALUE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One frame of a Ruby backtrace
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RubyFrame {
    /// Source file of the method
    pub file_name: Option<String>,

    /// Line in the source file
    pub file_line: u32,

    /// Method name
    pub function_name: Option<String>,

    /// True for interpreter-internal names such as `main` or `top (required)`
    pub special_function: bool,

    /// How many blocks deep inside the method the frame is
    pub block_level: u32,

    /// How many rescue handlers deep inside the method the frame is
    pub rescue_level: u32,
}

/// Wire representation: the special flag is encoded by key choice.
#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
struct RubyFrameJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    file_line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    special_function: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    block_level: u32,
    #[serde(skip_serializing_if = "is_zero")]
    rescue_level: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl Serialize for RubyFrame {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut wire = RubyFrameJson {
            file_name: self.file_name.clone(),
            file_line: self.file_line,
            block_level: self.block_level,
            rescue_level: self.rescue_level,
            ..Default::default()
        };
        if self.special_function {
            wire.special_function = self.function_name.clone();
        } else {
            wire.function_name = self.function_name.clone();
        }
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RubyFrame {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = RubyFrameJson::deserialize(deserializer)?;
        let mut frame = RubyFrame {
            file_name: wire.file_name,
            file_line: wire.file_line,
            block_level: wire.block_level,
            rescue_level: wire.rescue_level,
            ..Default::default()
        };
        match (wire.function_name, wire.special_function) {
            (Some(name), _) => frame.function_name = Some(name),
            (None, Some(name)) => {
                frame.function_name = Some(name);
                frame.special_function = true;
            }
            (None, None) => {}
        }
        Ok(frame)
    }
}

impl RubyFrame {
    /// Identity comparator input for the distance metrics
    pub fn distance_token(&self) -> FrameToken {
        FrameToken {
            symbol: self
                .function_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_FUNCTION.to_string()),
            component: self.file_name.clone(),
        }
    }

    pub fn append_bthash_text(&self, out: &mut String) {
        use std::fmt::Write;
        let _ = writeln!(
            out,
            "{}, {}, {}, {}, {}, {}",
            self.file_name.as_deref().unwrap_or(UNKNOWN_VALUE),
            self.file_line,
            self.function_name.as_deref().unwrap_or(UNKNOWN_VALUE),
            self.special_function as u8,
            self.block_level,
            self.rescue_level,
        );
    }

    /// Identity line for the near-duplicate hash: `file:line`
    pub fn append_duphash_text(&self, out: &mut String) {
        use std::fmt::Write;
        let _ = writeln!(
            out,
            "{}:{}",
            self.file_name.as_deref().unwrap_or(UNKNOWN_VALUE),
            self.file_line
        );
    }
}

impl fmt::Display for RubyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.block_level > 0 {
            write!(f, "block ({} levels) in ", self.block_level)?;
        }
        if self.rescue_level > 0 {
            write!(f, "rescue in ")?;
        }
        write!(
            f,
            "{}{}{}",
            if self.special_function { "<" } else { "" },
            self.function_name.as_deref().unwrap_or(UNKNOWN_FUNCTION),
            if self.special_function { ">" } else { "" }
        )?;
        if let Some(file_name) = &self.file_name {
            write!(f, " in {}", file_name)?;
            if self.file_line != 0 {
                write!(f, ":{}", self.file_line)?;
            }
        }
        Ok(())
    }
}

/// A parsed Ruby backtrace (single implicit thread)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RubyStacktrace {
    /// Class name of the exception
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_name: Option<String>,

    /// Call frames, crash point first
    #[serde(rename = "stacktrace", skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<RubyFrame>,
}

impl RubyStacktrace {
    pub fn distance_tokens(&self) -> Vec<FrameToken> {
        self.frames.iter().map(RubyFrame::distance_token).collect()
    }
}
