//! In-place stacktrace normalization.
//!
//! Invoked explicitly, never on construction. Each variant gets rid of the
//! frames that describe the crash-capture machinery rather than the crash,
//! and collapses recursion so stacks of different recursion depths compare
//! as equivalent. Frame counts may shrink; callers must re-measure.
//! Crash-thread marking is never touched.

use crate::model::core::{CoreStacktrace, CoreThread};
use crate::model::gdb::{GdbStacktrace, GdbThread};
use crate::model::koops::KoopsStacktrace;
use crate::model::python::PythonStacktrace;
use crate::model::ruby::RubyStacktrace;
use crate::model::stacktrace::Stacktrace;
use crate::utils::config::{
    GLIBC_EXIT_FUNCTIONS, KOOPS_BLACKLIST, NATIVE_PLUMBING_FUNCTIONS, UNKNOWN_FUNCTION,
};
use log::debug;

/// Normalize a stacktrace of any variant, thread by thread
pub fn normalize(stacktrace: &mut Stacktrace) {
    match stacktrace {
        Stacktrace::Core(s) => normalize_core(s),
        Stacktrace::Gdb(s) => normalize_gdb(s),
        Stacktrace::Python(s) => normalize_python(s),
        Stacktrace::Ruby(s) => normalize_ruby(s),
        Stacktrace::Kerneloops(s) => normalize_koops(s),
    }
}

pub fn normalize_gdb(stacktrace: &mut GdbStacktrace) {
    for thread in &mut stacktrace.threads {
        normalize_gdb_thread(thread);
    }
}

pub fn normalize_core(stacktrace: &mut CoreStacktrace) {
    for thread in &mut stacktrace.threads {
        normalize_core_thread(thread);
    }
}

/// Normalize one debugger thread.
///
/// The crashed process was often already inside the exit/abort/raise
/// machinery when the backtrace was captured; everything from that frame
/// down to the crash point is capture noise, not crash identity.
pub fn normalize_gdb_thread(thread: &mut GdbThread) {
    let before = thread.frames.len();

    // Frames are stored crash point first; "above" the exit frame means
    // earlier in the vector.
    let exit_index = thread.frames.iter().rposition(|frame| {
        frame
            .function_name
            .as_deref()
            .is_some_and(|name| GLIBC_EXIT_FUNCTIONS.contains(&name))
    });
    if let Some(exit_index) = exit_index {
        thread.frames.drain(..=exit_index);
    }

    thread.frames.retain(|frame| {
        if frame.signal_handler_called {
            return false; // signal delivery trampoline
        }
        !frame
            .function_name
            .as_deref()
            .is_some_and(|name| NATIVE_PLUMBING_FUNCTIONS.contains(&name))
    });

    // A 0x0 first or last frame named "??" is a dereferenced null or a
    // stack-walk artifact, not a real call site.
    let is_null_deref = |frame: &crate::model::gdb::GdbFrame| {
        frame.address == 0 && frame.function_name.as_deref() == Some(UNKNOWN_FUNCTION)
    };
    if thread.frames.first().is_some_and(|f| is_null_deref(f)) {
        thread.frames.remove(0);
    }
    if thread.frames.last().is_some_and(|f| is_null_deref(f)) {
        thread.frames.pop();
    }

    // Merge recursively called functions into a single frame.
    thread.frames.dedup_by(|current, previous| {
        match (&previous.function_name, &current.function_name) {
            (Some(a), Some(b)) => a != UNKNOWN_FUNCTION && a == b,
            _ => false,
        }
    });

    if thread.frames.len() != before {
        debug!(
            "Normalized debugger thread {}: {} -> {} frames",
            thread.number,
            before,
            thread.frames.len()
        );
    }
}

/// Normalize one core dump thread; the same rules as the debugger
/// variant, applied to unwinder frames.
pub fn normalize_core_thread(thread: &mut CoreThread) {
    let exit_index = thread.frames.iter().rposition(|frame| {
        frame
            .function_name
            .as_deref()
            .is_some_and(|name| GLIBC_EXIT_FUNCTIONS.contains(&name))
    });
    if let Some(exit_index) = exit_index {
        thread.frames.drain(..=exit_index);
    }

    thread.frames.retain(|frame| {
        !frame
            .function_name
            .as_deref()
            .is_some_and(|name| NATIVE_PLUMBING_FUNCTIONS.contains(&name))
    });

    // Unwinder frames without a symbol at address 0 are dereferenced
    // nulls (first) or walk artifacts (last).
    let is_null_deref =
        |frame: &crate::model::core::CoreFrame| frame.address == 0 && frame.build_id.is_none();
    if thread.frames.first().is_some_and(|f| is_null_deref(f)) && thread.frames.len() > 1 {
        thread.frames.remove(0);
    }
    if thread.frames.last().is_some_and(|f| is_null_deref(f)) && thread.frames.len() > 1 {
        thread.frames.pop();
    }

    thread.frames.dedup_by(|current, previous| {
        match (&previous.function_name, &current.function_name) {
            (Some(a), Some(b)) => a != UNKNOWN_FUNCTION && a == b,
            _ => false,
        }
    });
}

/// Normalize a kernel oops.
///
/// Compiler-generated symbol suffixes (`.isra.3`, `.constprop.12`) are cut
/// so the same function compares equal across kernel builds, scheduler and
/// warning plumbing is dropped unless the frame belongs to a module, and
/// directly recursive calls collapse into one frame.
pub fn normalize_koops(stacktrace: &mut KoopsStacktrace) {
    for frame in &mut stacktrace.frames {
        if let Some(name) = &mut frame.function_name {
            if let Some(dot) = name.find('.') {
                name.truncate(dot);
            }
        }
        if let Some(name) = &mut frame.from_function_name {
            if let Some(dot) = name.find('.') {
                name.truncate(dot);
            }
        }
    }

    stacktrace.frames.retain(|frame| {
        if frame.module_name.is_some() {
            return true; // module frames are identifying
        }
        match frame.function_name.as_deref() {
            Some(name) => KOOPS_BLACKLIST.binary_search(&name).is_err(),
            None => true,
        }
    });

    // Recursion collapse runs last so frames made identical by suffix
    // truncation merge too. Unnamed frames are only addresses and are
    // never merged.
    stacktrace.frames.dedup_by(|current, previous| {
        match (&previous.function_name, &current.function_name) {
            (Some(a), Some(b)) => a == b && previous.module_name == current.module_name,
            _ => false,
        }
    });
}

pub fn normalize_python(stacktrace: &mut PythonStacktrace) {
    // Collapse recursion: same source location and function repeated
    // directly below itself.
    stacktrace.frames.dedup_by(|current, previous| {
        previous.file_name == current.file_name
            && previous.file_line == current.file_line
            && previous.function_name == current.function_name
    });
}

pub fn normalize_ruby(stacktrace: &mut RubyStacktrace) {
    stacktrace.frames.dedup_by(|current, previous| {
        previous.file_name == current.file_name
            && previous.file_line == current.file_line
            && previous.function_name == current.function_name
            && previous.block_level == current.block_level
            && previous.rescue_level == current.rescue_level
    });
}
