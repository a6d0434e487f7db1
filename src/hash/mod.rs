//! Content-addressed hashing for duplicate detection.
//!
//! Two hash classes with different sensitivity:
//!
//! - [`bthash`] digests a canonical text of the whole stacktrace; any frame
//!   difference changes it. Exact-duplicate detection.
//! - [`duphash`] digests only the identity lines of the first N crash-thread
//!   frames, after normalization. Near-duplicate detection.
//!
//! Both are pure functions of their input; digests are equal iff the
//! canonical texts are equal.

use crate::model::stacktrace::Stacktrace;
use crate::normalize;
use crate::utils::config::UNKNOWN_VALUE;
use crate::utils::error::HashError;
use log::debug;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Flags for the full-stacktrace hash
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BthashFlags {
    /// Return the canonical text instead of its digest
    pub nohash: bool,
}

/// Flags for the near-duplicate hash
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuphashFlags {
    /// Return the canonical text instead of its digest
    pub nohash: bool,

    /// Hash the frames exactly as supplied, skipping normalization
    pub nonormalize: bool,

    /// Kernel-oops legacy convention: unreliable frames are skipped
    pub koops_compat: bool,
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Full-stacktrace hash: variant metadata header, then one canonical line
/// per frame, blank line between threads. Lowercase hex digest, or the
/// canonical text itself with [`BthashFlags::nohash`].
pub fn bthash(stacktrace: &Stacktrace, flags: BthashFlags) -> String {
    let mut text = String::new();

    // Variant metadata header, terminated by a blank line.
    match stacktrace {
        Stacktrace::Gdb(_) => {}
        Stacktrace::Core(s) => {
            let _ = writeln!(
                text,
                "Executable: {}",
                s.executable.as_deref().unwrap_or(UNKNOWN_VALUE)
            );
            let _ = writeln!(text, "Signal: {}", s.signal);
        }
        Stacktrace::Python(s) => {
            let _ = writeln!(
                text,
                "Exception: {}",
                s.exception_name.as_deref().unwrap_or(UNKNOWN_VALUE)
            );
        }
        Stacktrace::Ruby(s) => {
            let _ = writeln!(
                text,
                "Exception: {}",
                s.exception_name.as_deref().unwrap_or(UNKNOWN_VALUE)
            );
        }
        Stacktrace::Kerneloops(s) => {
            let _ = writeln!(
                text,
                "Version: {}",
                s.version.as_deref().unwrap_or(UNKNOWN_VALUE)
            );
            let _ = writeln!(text, "Flags: {}", s.taint_flags.letters());
            let _ = writeln!(text, "Modules: {}", s.modules.join(", "));
        }
    }
    text.push('\n');

    match stacktrace {
        Stacktrace::Gdb(s) => {
            for (index, thread) in s.threads.iter().enumerate() {
                if index > 0 {
                    text.push('\n');
                }
                for frame in &thread.frames {
                    frame.append_bthash_text(&mut text);
                }
            }
        }
        Stacktrace::Core(s) => {
            for (index, thread) in s.threads.iter().enumerate() {
                if index > 0 {
                    text.push('\n');
                }
                for frame in &thread.frames {
                    frame.append_bthash_text(&mut text);
                }
            }
        }
        Stacktrace::Python(s) => {
            for frame in &s.frames {
                frame.append_bthash_text(&mut text);
            }
        }
        Stacktrace::Ruby(s) => {
            for frame in &s.frames {
                frame.append_bthash_text(&mut text);
            }
        }
        Stacktrace::Kerneloops(s) => {
            for frame in &s.frames {
                frame.append_bthash_text(&mut text);
            }
        }
    }

    if flags.nohash {
        return text;
    }
    sha256_hex(&text)
}

/// Near-duplicate hash over the crash thread.
///
/// `frames` limits how many identity lines are hashed; 0 means all,
/// negative is rejected. The thread is normalized on an internal copy
/// first unless [`DuphashFlags::nonormalize`] is set; the caller's
/// stacktrace is never mutated.
pub fn duphash(
    stacktrace: &Stacktrace,
    frames: i32,
    prefix: Option<&str>,
    flags: DuphashFlags,
) -> Result<String, HashError> {
    if frames < 0 {
        return Err(HashError::InvalidFrameCount(frames));
    }
    let limit = frames as usize;

    debug!(
        "Computing duphash over {} stacktrace (frames: {})",
        stacktrace.report_type(),
        frames
    );

    let mut text = String::new();
    if let Some(prefix) = prefix {
        text.push_str(prefix);
    }
    text.push_str("Thread\n");

    let mut emitted = 0usize;
    let mut emit = |line_producer: &mut dyn FnMut(&mut String)| {
        if limit != 0 && emitted >= limit {
            return false;
        }
        let len_before = text.len();
        line_producer(&mut text);
        if text.len() != len_before {
            emitted += 1;
        }
        true
    };

    match stacktrace {
        Stacktrace::Gdb(s) => {
            let mut thread = s
                .find_crash_thread()
                .or_else(|| s.threads.first())
                .cloned()
                .unwrap_or_default();
            if !flags.nonormalize {
                normalize::normalize_gdb_thread(&mut thread);
            }
            for frame in &thread.frames {
                if !emit(&mut |out| frame.append_duphash_text(out)) {
                    break;
                }
            }
        }
        Stacktrace::Core(s) => {
            let mut thread = s
                .find_crash_thread()
                .or_else(|| s.threads.first())
                .cloned()
                .unwrap_or_default();
            if !flags.nonormalize {
                normalize::normalize_core_thread(&mut thread);
            }
            for frame in &thread.frames {
                if !emit(&mut |out| frame.append_duphash_text(out)) {
                    break;
                }
            }
        }
        Stacktrace::Python(s) => {
            let mut copy = s.clone();
            if !flags.nonormalize {
                normalize::normalize_python(&mut copy);
            }
            for frame in &copy.frames {
                if !emit(&mut |out| frame.append_duphash_text(out)) {
                    break;
                }
            }
        }
        Stacktrace::Ruby(s) => {
            let mut copy = s.clone();
            if !flags.nonormalize {
                normalize::normalize_ruby(&mut copy);
            }
            for frame in &copy.frames {
                if !emit(&mut |out| frame.append_duphash_text(out)) {
                    break;
                }
            }
        }
        Stacktrace::Kerneloops(s) => {
            let mut copy = s.clone();
            if !flags.nonormalize {
                normalize::normalize_koops(&mut copy);
            }
            for frame in &copy.frames {
                if !emit(&mut |out| frame.append_duphash_text(out, flags.koops_compat)) {
                    break;
                }
            }
        }
    }

    if flags.nohash {
        return Ok(text);
    }
    Ok(sha256_hex(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ruby::{RubyFrame, RubyStacktrace};

    fn ruby_trace() -> Stacktrace {
        let frame = |line: u32| RubyFrame {
            file_name: Some("will_crash.rb".to_string()),
            file_line: line,
            function_name: Some("crash".to_string()),
            ..Default::default()
        };
        Stacktrace::Ruby(RubyStacktrace {
            exception_name: Some("RuntimeError".to_string()),
            frames: vec![frame(13), frame(10), frame(9), frame(2)],
        })
    }

    #[test]
    fn test_duphash_plaintext_layout() {
        let trace = ruby_trace();
        let flags = DuphashFlags {
            nohash: true,
            ..Default::default()
        };
        let text = duphash(&trace, 3, None, flags).unwrap();
        assert_eq!(
            text,
            "Thread\nwill_crash.rb:13\nwill_crash.rb:10\nwill_crash.rb:9\n"
        );
    }

    #[test]
    fn test_duphash_negative_frames_rejected() {
        let trace = ruby_trace();
        assert!(matches!(
            duphash(&trace, -1, None, DuphashFlags::default()),
            Err(HashError::InvalidFrameCount(-1))
        ));
    }

    #[test]
    fn test_duphash_prefix_changes_digest_not_layout() {
        let trace = ruby_trace();
        let plain = duphash(&trace, 0, None, DuphashFlags::default()).unwrap();
        let prefixed = duphash(&trace, 0, Some("ruby;"), DuphashFlags::default()).unwrap();
        assert_ne!(plain, prefixed);
        assert_eq!(plain.len(), prefixed.len()); // both hex digests
    }

    #[test]
    fn test_bthash_deterministic_and_sensitive() {
        let trace = ruby_trace();
        let first = bthash(&trace, BthashFlags::default());
        let second = bthash(&trace, BthashFlags::default());
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);

        let mut other = ruby_trace();
        if let Stacktrace::Ruby(s) = &mut other {
            s.frames[0].file_line = 14;
        }
        assert_ne!(first, bthash(&other, BthashFlags::default()));
    }
}
