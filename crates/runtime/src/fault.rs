//! Guest fault taxonomy.
//!
//! A fault is how a hosted guest dies: the executor stops at the faulting
//! instruction and reports the fault to the host in the run outcome. There
//! is no guest-visible recovery path, matching the fail-stop contract of
//! the native guard. The host, by contrast, sees a perfectly ordinary value
//! and decides what to do next.

use thiserror::Error;

/// Why a guest run stopped before completing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Fault {
    /// A `__bounds_guard` call failed. Carries the truth values of the two
    /// sub-conditions so the host can tell an underflow from an overflow.
    #[error(
        "out-of-bounds access: ptr {ptr:#x} size {size} (base_ok={base_ok}, limit_ok={limit_ok})"
    )]
    OutOfBounds {
        ptr: u64,
        size: u64,
        base_ok: bool,
        limit_ok: bool,
    },

    /// A `__verifier_assert` call saw zero.
    #[error("assertion failed")]
    AssertFailed,

    /// A raw access landed outside guest memory entirely (below the
    /// function table or past the end). This is the moral equivalent of a
    /// segfault in uninstrumented code.
    #[error("wild access outside guest memory: ptr {ptr:#x} size {size}")]
    WildAccess { ptr: u64, size: u64 },

    #[error("division by zero")]
    DivideByZero,

    #[error("step limit exhausted")]
    OutOfFuel,

    #[error("call depth limit exceeded")]
    CallDepthExceeded,

    #[error("stack exhausted")]
    StackExhausted,

    #[error("call to undefined symbol `{0}`")]
    UndefinedSymbol(String),

    #[error("indirect call through {0:#x}, which is not a defined function")]
    BadFunctionPointer(u64),
}
