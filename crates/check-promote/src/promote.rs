// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use ir::names;
use ir::{Callee, CmpPred, Inst, Linkage, Module, Operand};

use crate::ids::VerifiedIds;

/// One assertion call site, addressed by position in module order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionSite {
    /// Sequence number, starting at 1.
    pub seq: u64,
    pub fn_index: usize,
    pub block_index: usize,
    pub inst_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionSummary {
    /// Total assertion sites the module contains.
    pub sites: usize,
    /// Sequence numbers actually rewritten, ascending.
    pub promoted: Vec<u64>,
    pub entry_restored: bool,
}

/// Number every assertion call site in module order.
///
/// The traversal is the module's declaration order and nothing else, so the
/// numbering is a pure function of module content. An external verifier
/// walking the same module the same way sees the same numbers.
pub fn assertion_sites(module: &Module) -> Vec<AssertionSite> {
    let mut sites = Vec::new();
    let mut seq = 0u64;
    for (fi, f) in module.functions.iter().enumerate() {
        for (bi, block) in f.blocks.iter().enumerate() {
            for (ii, inst) in block.insts.iter().enumerate() {
                if assertion_condition(inst).is_some() {
                    seq += 1;
                    sites.push(AssertionSite {
                        seq,
                        fn_index: fi,
                        block_index: bi,
                        inst_index: ii,
                    });
                }
            }
        }
    }
    sites
}

/// Rewrite every verified assertion into a trusted fact and restore the
/// entry point.
pub fn promote(module: &mut Module, ids: &VerifiedIds) -> PromotionSummary {
    let sites = assertion_sites(module);
    let total = sites.len();
    let mut promoted = Vec::new();

    // Each rewrite grows its block by one instruction, shifting the
    // recorded indices of later sites in the same block.
    let mut shift: HashMap<(usize, usize), usize> = HashMap::new();
    for site in &sites {
        if !ids.contains(site.seq) {
            continue;
        }
        let f = &mut module.functions[site.fn_index];
        let t = f.fresh_reg();
        let offset = shift.entry((site.fn_index, site.block_index)).or_insert(0);
        let idx = site.inst_index + *offset;
        let block = &mut f.blocks[site.block_index];
        let cond = match block.insts.get(idx).and_then(assertion_condition) {
            Some(cond) => cond.clone(),
            None => continue,
        };
        block.insts.splice(
            idx..=idx,
            [
                Inst::Cmp {
                    dst: t,
                    pred: CmpPred::Ne,
                    lhs: cond,
                    rhs: Operand::Imm(0),
                },
                Inst::Call {
                    dst: None,
                    callee: Callee::Sym(names::TRUST.to_string()),
                    args: vec![Operand::Reg(t)],
                },
            ],
        );
        *offset += 1;
        promoted.push(site.seq);
    }

    let entry_restored = restore_entry(module);
    PromotionSummary {
        sites: total,
        promoted,
        entry_restored,
    }
}

/// Re-expose `entry` to the rest of the toolchain: external linkage, no
/// do-not-optimize marking. Runs regardless of the verified set and is
/// idempotent. A module without a defined `entry` is left alone.
pub fn restore_entry(module: &mut Module) -> bool {
    match module.function_mut(names::ENTRY) {
        Some(f) if !f.is_declaration() => {
            f.linkage = Linkage::External;
            f.optnone = false;
            true
        }
        _ => false,
    }
}

/// The condition argument if `inst` is an assertion call site: a direct
/// call to the assertion hook, no result register, exactly one argument.
fn assertion_condition(inst: &Inst) -> Option<&Operand> {
    match inst {
        Inst::Call {
            dst: None,
            callee: Callee::Sym(name),
            args,
        } if name == names::VERIFIER_ASSERT && args.len() == 1 => args.first(),
        _ => None,
    }
}
