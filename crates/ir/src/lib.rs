// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Word-oriented intermediate representation shared by the hardening passes
//! and the runtime.
//!
//! A [`Module`] is a flat list of globals and functions; a [`Function`] is a
//! flat list of labeled blocks, each ending in a single terminator. Values
//! are 64-bit words held in virtual registers (`%0`, `%1`, ...); memory is
//! byte-addressed and accessed through typed loads, stores, and atomics.
//!
//! The representation exists to make memory traffic explicit and easy to
//! rewrite: every instruction that touches memory answers
//! [`Inst::mem_access`] with the address operand and the access size in
//! bytes, so a pass can treat "the set of memory accesses" as a closed set
//! of enum variants rather than an open-ended type query.
//!
//! Declaration order is meaningful. Passes traverse globals, functions,
//! blocks, and instructions strictly in the order they appear in the module,
//! and anything derived from that order (for example assertion sequence
//! numbers) is stable across runs as long as the module text is unchanged.
//!
//! # Text format
//!
//! Modules round-trip through a line-oriented text format:
//!
//! ```text
//! global seed: i64 = 42
//! global table: [8 x i64]
//!
//! fn entry() {
//! bb0:
//!   %0 = alloca i64, 10
//!   %1 = call @malloc(80)
//!   %2 = add %1, 8
//!   store i64 7, %2
//!   %3 = load i64, %2
//!   %4 = icmp slt %3, 10
//!   br %4, then, done
//! then:
//!   jmp done
//! done:
//!   ret %3
//! }
//! ```
//!
//! [`parse_module`] builds a [`Module`] from this format and
//! [`print_module`] renders one back; parsing the printed form yields a
//! structurally identical module.

mod inst;
mod module;
pub mod names;
mod parser;
mod printer;
mod types;

pub use inst::{BinOp, BlockId, Callee, CmpPred, Inst, MemAccess, Operand, Reg, RmwOp, Term};
pub use module::{Block, Function, Global, Linkage, Module};
pub use parser::{parse_module, ParseError, ParseErrorKind};
pub use printer::{print_function, print_module};
pub use types::Ty;
