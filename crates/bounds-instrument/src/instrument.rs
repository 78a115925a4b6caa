// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::mem;

use ir::names;
use ir::{BinOp, Callee, Function, Inst, Module, Operand, Reg};

/// What one run of the pass inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstrumentSummary {
    pub guards: usize,
    pub assumes: usize,
    pub entry_seeded: bool,
}

/// Instrument every function in place. See the crate docs for the three
/// kinds of insertion.
pub fn instrument(module: &mut Module) -> InstrumentSummary {
    let mut summary = InstrumentSummary::default();
    summary.entry_seeded = seed_entry(module, &mut summary.assumes);
    for f in &mut module.functions {
        instrument_function(f, &mut summary);
    }
    summary
}

/// Size of a fresh allocation: either an operand usable as-is, or a product
/// that needs a `mul` in front of the assumption.
enum SizeExpr {
    Direct(Operand),
    Product(Operand, Operand),
}

fn instrument_function(f: &mut Function, summary: &mut InstrumentSummary) {
    let mut blocks = mem::take(&mut f.blocks);
    for block in &mut blocks {
        let old = mem::take(&mut block.insts);
        let mut out = Vec::with_capacity(old.len() * 2);
        for inst in old {
            if let Some(access) = inst.mem_access() {
                out.push(rt_call(
                    names::GUARD,
                    vec![access.addr.clone(), Operand::Imm(access.size as i64)],
                ));
                summary.guards += 1;
                out.push(inst);
                continue;
            }
            let alloc = allocation(&inst);
            out.push(inst);
            if let Some((dst, size)) = alloc {
                let size = match size {
                    SizeExpr::Direct(op) => op,
                    SizeExpr::Product(Operand::Imm(a), Operand::Imm(b)) => {
                        Operand::Imm(a.wrapping_mul(b))
                    }
                    SizeExpr::Product(a, b) => {
                        let t = f.fresh_reg();
                        out.push(Inst::Bin {
                            dst: t,
                            op: BinOp::Mul,
                            lhs: a,
                            rhs: b,
                        });
                        Operand::Reg(t)
                    }
                };
                out.push(rt_call(names::ASSUME, vec![Operand::Reg(dst), size]));
                summary.assumes += 1;
            }
        }
        block.insts = out;
    }
    f.blocks = blocks;
}

/// The register and extent defined by an allocating instruction, if any.
///
/// Allocator calls only count when they are direct and their result is
/// used; an indirect call that happens to reach `malloc` is invisible here,
/// as is a `malloc` call whose pointer is discarded. Calls with too few
/// arguments still count, with extent zero.
fn allocation(inst: &Inst) -> Option<(Reg, SizeExpr)> {
    match inst {
        Inst::Alloca { dst, ty, count } => {
            let elem = Operand::Imm(ty.size_bytes() as i64);
            let size = match count {
                None => SizeExpr::Direct(elem),
                Some(count) => SizeExpr::Product(count.clone(), elem),
            };
            Some((*dst, size))
        }
        Inst::Call {
            dst: Some(dst),
            callee: Callee::Sym(name),
            args,
        } => {
            let size = match name.as_str() {
                names::MALLOC => SizeExpr::Direct(arg(args, 0)),
                names::CALLOC => match (args.first(), args.get(1)) {
                    (Some(n), Some(s)) => SizeExpr::Product(n.clone(), s.clone()),
                    _ => SizeExpr::Direct(Operand::Imm(0)),
                },
                names::REALLOC => SizeExpr::Direct(arg(args, 1)),
                _ => return None,
            };
            Some((*dst, size))
        }
        _ => None,
    }
}

fn arg(args: &[Operand], i: usize) -> Operand {
    args.get(i).cloned().unwrap_or(Operand::Imm(0))
}

/// Prefix `entry` with assumptions for every global and defined function.
/// Returns false when the module has no defined `entry` to seed.
fn seed_entry(module: &mut Module, assumes: &mut usize) -> bool {
    match module.function(names::ENTRY) {
        Some(f) if !f.is_declaration() => {}
        _ => return false,
    }
    let mut seeds = Vec::new();
    for g in &module.globals {
        if g.name.starts_with(names::RESERVED_PREFIX) {
            continue;
        }
        seeds.push(rt_call(
            names::ASSUME,
            vec![
                Operand::Sym(g.name.clone()),
                Operand::Imm(g.ty.size_bytes() as i64),
            ],
        ));
    }
    for f in &module.functions {
        if f.is_declaration() || f.name.starts_with(names::RESERVED_PREFIX) {
            continue;
        }
        seeds.push(rt_call(
            names::ASSUME,
            vec![Operand::Sym(f.name.clone()), Operand::Imm(1)],
        ));
    }
    *assumes += seeds.len();
    if let Some(entry) = module.function_mut(names::ENTRY) {
        if let Some(first) = entry.blocks.first_mut() {
            first.insts.splice(0..0, seeds);
        }
    }
    true
}

fn rt_call(name: &str, args: Vec<Operand>) -> Inst {
    Inst::Call {
        dst: None,
        callee: Callee::Sym(name.to_string()),
        args,
    }
}
