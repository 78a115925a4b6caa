// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Enforcement runtime for bounds-instrumented modules.
//!
//! This crate is the execution half of the hardening pipeline: modules that
//! went through access instrumentation (and, optionally, verified-check
//! promotion) run here, and the checks the passes inserted resolve against
//! one process-wide valid region.
//!
//! # Overview
//!
//! The runtime handles:
//! - Describing the admissible address window as a [`ValidRegion`]
//! - Answering `__bounds_guard` probes, fail-stop on violation
//! - Loading modules into a deterministic guest memory layout ([`Image`])
//! - Running functions in-process and reporting how they ended
//!
//! # Architecture
//!
//! ```text
//! ir::Module (instrumented text)
//!      ↓ Image::build
//! Image (globals placed, symbols resolved)
//!      ↓
//! Executor → RunOutcome { status, steps, asserts }
//! ```
//!
//! # Enforcement Contract
//!
//! Instrumented code calls two runtime hooks:
//!
//! ```text
//! call @__bounds_guard(ptr, size)    before every load/store/atomic
//! call @__bounds_assume(ptr, size)   after every allocation
//! ```
//!
//! A guard checks `base <= ptr && ptr + size <= limit` against the
//! installed region and stops the program when either half fails; `size`
//! zero is trivially in bounds. An assume is a no-op here: it exists for
//! offline analyzers that consume the same hook names, and the runtime
//! keeps it callable so instrumented modules link unchanged.
//!
//! Two enforcement surfaces share those semantics. The `extern "C"`
//! exports ([`__bounds_guard`] and friends) guard the host process itself
//! against a region installed with [`install`]; the [`Executor`] interprets
//! modules against a per-executor region and turns violations into
//! [`Fault`] values the host can inspect instead of dying on.
//!
//! # Thread Safety
//!
//! The native region is a process-wide one-shot: once [`install`] succeeds,
//! every thread sees the same region and later installs fail. Executors are
//! independent of that global and of each other; each run works on its own
//! copy of the image's memory.

mod enforce;
mod error;
mod execute;
mod fault;
mod image;
mod region;

pub use enforce::{__bounds_assume, __bounds_guard, __verifier_assert, assume, guard};
pub use error::{RuntimeError, RuntimeResult};
pub use execute::{
    ExecStatus, Executor, RunOutcome, DEFAULT_CALL_DEPTH, DEFAULT_STEP_LIMIT,
};
pub use fault::Fault;
pub use image::{
    Image, DEFAULT_MEMORY, FUNC_TABLE_BASE, GLOBALS_BASE, HEAP_BASE, STACK_BASE,
};
pub use region::{install, installed, Check, ValidRegion};
