// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Enforcement primitives and the C-callable surface.
//!
//! Instrumented native objects link against these symbols directly: the
//! instrumentation pass inserts calls to `__bounds_guard` and
//! `__bounds_assume`, and un-promoted assertion sites call
//! `__verifier_assert`. All three are thin wrappers over the process-wide
//! region installed via [`crate::install`].
//!
//! The guard is fail-stop. It either returns (the access is admissible) or
//! the process is gone; guarded code never observes a failed check, so
//! there is no error value to mishandle and nothing for an attacker to
//! steer after a violation.

use std::ffi::c_void;
use std::process;

use crate::region::{installed, Check};

/// Fail-stop bounds check against the installed process-wide region.
///
/// A guard reached before any region is installed counts as a violation:
/// the loader contract is install-then-run.
pub fn guard(ptr: u64, size: u64) {
    let check = match installed() {
        Some(region) => region.check(ptr, size),
        None => Check { base_ok: false, limit_ok: false },
    };
    if !check.ok() {
        process::abort();
    }
}

/// Validity fact for downstream verification. Never has a runtime effect.
#[inline(always)]
pub fn assume(_ptr: u64, _size: u64) {}

#[no_mangle]
pub extern "C" fn __bounds_guard(ptr: *const c_void, size: usize) {
    guard(ptr as u64, size as u64);
}

#[no_mangle]
pub extern "C" fn __bounds_assume(ptr: *const c_void, size: usize) {
    assume(ptr as u64, size as u64);
}

/// Runtime half of an assertion site the verifier did not discharge.
#[no_mangle]
pub extern "C" fn __verifier_assert(cond: i64) {
    if cond == 0 {
        process::abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{install, ValidRegion};
    use std::ptr;

    fn ensure_region() {
        // Shared with the region tests: [0x1000, 0x2000).
        let _ = install(ValidRegion::new(0x1000, 0x2000).unwrap());
    }

    #[test]
    fn admissible_guards_return() {
        ensure_region();
        guard(0x1000, 0);
        guard(0x1000, 8);
        guard(0x1fff, 1);
        guard(0x1ff8, 8);
    }

    #[test]
    fn assume_is_inert_everywhere() {
        // No region needed; assume never checks anything.
        assume(0, 0);
        assume(u64::MAX, u64::MAX);
        __bounds_assume(ptr::null(), usize::MAX);
    }

    #[test]
    fn true_assertions_return() {
        __verifier_assert(1);
        __verifier_assert(-7);
    }
}
