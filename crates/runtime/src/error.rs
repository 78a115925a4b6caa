// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the runtime crate

use thiserror::Error;

/// Host-side errors: problems setting up or addressing a guest, as opposed
/// to [`Fault`](crate::Fault)s the guest itself runs into.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("valid region is reversed (base {base:#x} > limit {limit:#x})")]
    ReversedRegion { base: u64, limit: u64 },

    #[error("a valid region is already installed for this process")]
    RegionAlreadyInstalled,

    #[error("duplicate symbol: {symbol}")]
    DuplicateSymbol { symbol: String },

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("function `{name}` is a declaration; nothing to run")]
    NotDefined { name: String },

    #[error("function `{name}` takes {expects} arguments, {got} given")]
    WrongArity { name: String, expects: u32, got: usize },

    #[error("guest memory of {size:#x} bytes is too small (needs at least {needed:#x})")]
    MemoryTooSmall { size: usize, needed: usize },

    #[error("module globals need {needed:#x} bytes, {available:#x} available")]
    GlobalsTooLarge { needed: u64, available: u64 },
}

/// Result type alias for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;
