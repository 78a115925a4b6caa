// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Modules, functions, blocks, and globals.

use crate::inst::{Inst, Reg, Term};
use crate::types::Ty;

/// Whether a function can be reached from outside the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    External,
    Internal,
}

/// A module-level variable. Scalars may carry an immediate initializer;
/// everything else starts zeroed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub name: String,
    pub ty: Ty,
    pub init: Option<i64>,
}

/// A labeled straight-line run of instructions ending in one terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub label: String,
    pub insts: Vec<Inst>,
    pub term: Term,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    /// Number of parameters; they occupy registers `%0 .. %params`.
    pub params: u32,
    pub linkage: Linkage,
    /// Do-not-optimize marking. Cleared when the function is re-exposed to
    /// downstream optimization.
    pub optnone: bool,
    /// Empty for declarations.
    pub blocks: Vec<Block>,
    /// Lowest register index not yet in use.
    pub next_reg: u32,
}

impl Function {
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Mint a register unused anywhere in this function.
    pub fn fresh_reg(&mut self) -> Reg {
        let reg = Reg(self.next_reg);
        self.next_reg += 1;
        reg
    }
}

/// A whole translation unit. The order of `globals` and `functions` is the
/// order they were declared in; passes rely on it for deterministic
/// traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&Global> {
        self.globals.iter().find(|g| g.name == name)
    }
}
