//! Python traceback model.
//!
//! Single implicit thread: the stacktrace itself is the crash thread.
//! `special_file`/`special_function` mirror the interpreter's angle-bracket
//! names (`<stdin>`, `<module>`); in JSON the value is written under the
//! special key instead of carrying a separate boolean, exactly like the
//! wire format this was parsed from.

use crate::distance::FrameToken;
use crate::utils::config::{UNKNOWN_FUNCTION, UNKNOWN_VALUE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One frame of a Python traceback
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct PythonFrame {
    /// Source file, or the special name without its angle brackets
    pub file_name: Option<String>,

    /// True when `file_name` is a special name such as `stdin`
    pub special_file: bool,

    /// Line in the source file
    pub file_line: u32,

    /// Function name, or the special name without its angle brackets
    pub function_name: Option<String>,

    /// True when `function_name` is a special name such as `module`
    pub special_function: bool,

    /// Text of the source line, if the interpreter included it
    pub line_contents: Option<String>,
}

/// Wire representation: the special flags are encoded by key choice.
#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
struct PythonFrameJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    special_file: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    file_line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    special_function: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line_contents: Option<String>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl Serialize for PythonFrame {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut wire = PythonFrameJson {
            file_line: self.file_line,
            line_contents: self.line_contents.clone(),
            ..Default::default()
        };
        if self.special_file {
            wire.special_file = self.file_name.clone();
        } else {
            wire.file_name = self.file_name.clone();
        }
        if self.special_function {
            wire.special_function = self.function_name.clone();
        } else {
            wire.function_name = self.function_name.clone();
        }
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PythonFrame {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = PythonFrameJson::deserialize(deserializer)?;
        let mut frame = PythonFrame {
            file_line: wire.file_line,
            line_contents: wire.line_contents,
            ..Default::default()
        };
        match (wire.file_name, wire.special_file) {
            (Some(name), _) => frame.file_name = Some(name),
            (None, Some(name)) => {
                frame.file_name = Some(name);
                frame.special_file = true;
            }
            (None, None) => {}
        }
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

impl PythonFrame {
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
            self.special_file as u8,
            self.file_line,
            self.function_name.as_deref().unwrap_or(UNKNOWN_VALUE),
            self.special_function as u8,
            self.line_contents.as_deref().unwrap_or(UNKNOWN_VALUE),
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

impl fmt::Display for PythonFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file_name) = &self.file_name {
            write!(
                f,
                "[{}{}{}",
                if self.special_file { "<" } else { "" },
                file_name,
                if self.special_file { ">" } else { "" }
            )?;
            if self.file_line != 0 {
                write!(f, ":{}", self.file_line)?;
            }
            write!(f, "]")?;
        }
        write!(
            f,
            " {}{}{}",
            if self.special_function { "<" } else { "" },
            self.function_name.as_deref().unwrap_or(UNKNOWN_FUNCTION),
            if self.special_function { ">" } else { "" }
        )
    }
}

/// A parsed Python traceback (single implicit thread)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonStacktrace {
    /// Class name of the exception that terminated the interpreter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_name: Option<String>,

    /// Call frames, crash point first
    #[serde(rename = "stacktrace", skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<PythonFrame>,
}

impl PythonStacktrace {
    pub fn distance_tokens(&self) -> Vec<FrameToken> {
        self.frames
            .iter()
            .map(PythonFrame::distance_token)
            .collect()
    }
}
