//! Constants shared across normalization, hashing and distance code.

/// Token used by debugger backtraces when the symbol is unknown
pub const UNKNOWN_FUNCTION: &str = "??";

/// Placeholder written into canonical hash text for absent string fields
pub const UNKNOWN_VALUE: &str = "<unknown>";

/// Weight given to common prefixes in the Jaro-Winkler score (always < 0.25)
pub const JARO_WINKLER_PREFIX_WEIGHT: f32 = 0.2;

/// Longest prefix the Jaro-Winkler boost considers
pub const JARO_WINKLER_PREFIX_CAP: usize = 4;

/// Current report envelope schema version
pub const UREPORT_VERSION: u32 = 2;

// Functions whose presence in a debugger backtrace marks the point where
// the process was already exiting; the exit frame and everything nearer to
// the crash point is capture noise.
pub const GLIBC_EXIT_FUNCTIONS: &[&str] = &[
    "__GI_abort",
    "__GI_raise",
    "__chk_fail",
    "__run_exit_handlers",
    "__stack_chk_fail",
    "abort",
    "exit",
    "kill",
    "raise",
];

// Process startup and thread plumbing common to every native backtrace.
pub const NATIVE_PLUMBING_FUNCTIONS: &[&str] = &[
    "__kernel_vsyscall",
    "__libc_start_main",
    "_start",
    "clone",
    "start_thread",
];

// Kernel functions dropped during oops normalization.
// !!! MUST BE SORTED !!! (binary-searched)
pub const KOOPS_BLACKLIST: &[&str] = &[
    "do_softirq",
    "do_vfs_ioctl",
    "dump_stack",
    "flush_kthread_worker",
    "gs_change",
    "irq_exit",
    "kernel_thread_helper",
    "kthread",
    "process_one_work",
    "system_call_fastpath",
    "warn_slowpath_common",
    "warn_slowpath_fmt",
    "warn_slowpath_fmt_taint",
    "warn_slowpath_null",
    "worker_thread",
];
