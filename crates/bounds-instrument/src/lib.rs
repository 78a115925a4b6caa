// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bounds instrumentation pass.
//!
//! Rewrites a module so that its memory behavior is explicit:
//!
//! 1. Every load, store, and atomic access is preceded by a call to
//!    `__bounds_guard(addr, size)`, where `size` is the byte width of the
//!    value moved. The guard is the runtime's fail-stop check.
//! 2. Every allocation — `alloca` and direct calls to `malloc`, `calloc`,
//!    and `realloc` — is followed by a call to
//!    `__bounds_assume(addr, size)` declaring the extent of the fresh
//!    object. Assumptions are facts for downstream verification; they cost
//!    nothing at runtime.
//! 3. If the module defines `entry`, its first block is prefixed with one
//!    assumption per global (its allocated size) and one per defined
//!    function (one byte, enough for address comparisons). Names under the
//!    reserved `builtin.` namespace are left out.
//!
//! The pass only inserts; existing instructions are never reordered or
//! removed, and the calls it inserts are themselves never treated as
//! accesses or allocations.

mod instrument;

pub use instrument::{instrument, InstrumentSummary};
