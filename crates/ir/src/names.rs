// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Symbol names the pipeline recognizes by convention.
//!
//! None of these are ever defined inside a user module: the bounds
//! primitives and the assertion hook resolve to the runtime, `builtin.*`
//! names are compiler-internal, and the allocator names resolve to the
//! host's allocator (or the executor's built-in one).

/// Bounds check inserted before every memory access. Fail-stop on
/// violation; returns nothing.
pub const GUARD: &str = "__bounds_guard";

/// Validity fact recorded after every allocation. Never has a runtime
/// effect.
pub const ASSUME: &str = "__bounds_assume";

/// Assertion hook whose call sites the promotion pass numbers and rewrites.
pub const VERIFIER_ASSERT: &str = "__verifier_assert";

/// Compiler-trusted fact standing in for a discharged assertion.
pub const TRUST: &str = "builtin.trust";

/// Reserved namespace excluded from start-of-program assumptions.
pub const RESERVED_PREFIX: &str = "builtin.";

/// The program entry point.
pub const ENTRY: &str = "entry";

pub const MALLOC: &str = "malloc";
pub const CALLOC: &str = "calloc";
pub const REALLOC: &str = "realloc";
pub const FREE: &str = "free";
