// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the instrumentation pass
//!
//! Where the unit tests pin exact output for small inputs, these tests
//! sweep the program fixtures under `tests/ir_samples/` and verify the
//! pass's structural contract on each:
//!
//! 1. Every memory access is immediately preceded by a guard naming the
//!    same address operand and byte size
//! 2. Every allocation is followed by an assumption covering its result
//! 3. Per-fixture insertion counts are exact
//! 4. Instrumented output is valid pass input again, so the CLI can be
//!    chained over text

use bounds_instrument::instrument;
use ir::{parse_module, print_module, Callee, Inst, Module, Operand, Reg};

const FIXTURES: [(&str, &str); 6] = [
    (
        "entry_array",
        include_str!("../../../tests/ir_samples/entry_array.ir"),
    ),
    (
        "heap_mix",
        include_str!("../../../tests/ir_samples/heap_mix.ir"),
    ),
    (
        "sort_pairs",
        include_str!("../../../tests/ir_samples/sort_pairs.ir"),
    ),
    ("chain", include_str!("../../../tests/ir_samples/chain.ir")),
    (
        "assert_grid",
        include_str!("../../../tests/ir_samples/assert_grid.ir"),
    ),
    (
        "global_sum",
        include_str!("../../../tests/ir_samples/global_sum.ir"),
    ),
];

fn instrumented(text: &str) -> Module {
    let mut module = parse_module(text).unwrap();
    instrument(&mut module);
    module
}

/// Result register of an allocating instruction, if any: an `alloca` or a
/// direct, result-carrying call to one of the heap allocators.
fn allocation_dst(inst: &Inst) -> Option<Reg> {
    match inst {
        Inst::Alloca { dst, .. } => Some(*dst),
        Inst::Call {
            dst: Some(dst),
            callee: Callee::Sym(name),
            ..
        } if matches!(name.as_str(), "malloc" | "calloc" | "realloc") => Some(*dst),
        _ => None,
    }
}

fn is_assume_for(inst: &Inst, reg: Reg) -> bool {
    matches!(
        inst,
        Inst::Call {
            dst: None,
            callee: Callee::Sym(name),
            args,
        } if name == "__bounds_assume" && args.first() == Some(&Operand::Reg(reg))
    )
}

#[test]
fn every_access_is_guarded_with_its_exact_extent() {
    for (name, text) in FIXTURES {
        let module = instrumented(text);
        for f in &module.functions {
            for block in &f.blocks {
                for (i, inst) in block.insts.iter().enumerate() {
                    let access = match inst.mem_access() {
                        Some(a) => a,
                        None => continue,
                    };
                    assert!(i > 0, "{name}/{}: `{inst}` opens its block unguarded", f.name);
                    match &block.insts[i - 1] {
                        Inst::Call {
                            dst: None,
                            callee: Callee::Sym(callee),
                            args,
                        } if callee == "__bounds_guard"
                            && args.first() == Some(access.addr)
                            && args.get(1) == Some(&Operand::Imm(access.size as i64)) => {}
                        other => panic!(
                            "{name}/{}: `{inst}` is preceded by `{other}`, not its guard",
                            f.name
                        ),
                    }
                }
            }
        }
    }
}

#[test]
fn every_allocation_is_covered_by_an_assumption() {
    for (name, text) in FIXTURES {
        let module = instrumented(text);
        for f in &module.functions {
            for block in &f.blocks {
                for (i, inst) in block.insts.iter().enumerate() {
                    let dst = match allocation_dst(inst) {
                        Some(dst) => dst,
                        None => continue,
                    };
                    // Either the assumption directly, or one size-materializing
                    // `mul` and then the assumption.
                    let direct = block.insts.get(i + 1).is_some_and(|n| is_assume_for(n, dst));
                    let via_mul = matches!(block.insts.get(i + 1), Some(Inst::Bin { .. }))
                        && block.insts.get(i + 2).is_some_and(|n| is_assume_for(n, dst));
                    assert!(
                        direct || via_mul,
                        "{name}/{}: allocation `{inst}` is not covered",
                        f.name
                    );
                }
            }
        }
    }
}

/// Insertion counts per fixture, checked exactly. The assume column counts
/// allocation assumptions plus the entry seeds (one per global plus one per
/// defined function).
#[test]
fn fixture_counts_are_exact() {
    let expected: [(&str, usize, usize); 6] = [
        ("entry_array", 2, 2),
        ("heap_mix", 5, 4),
        ("sort_pairs", 12, 2),
        ("chain", 4, 2),
        ("assert_grid", 0, 2),
        ("global_sum", 8, 5),
    ];
    for ((name, text), (expect_name, guards, assumes)) in FIXTURES.into_iter().zip(expected) {
        assert_eq!(name, expect_name);
        let mut module = parse_module(text).unwrap();
        let summary = instrument(&mut module);
        assert_eq!(summary.guards, guards, "{name}: guard count");
        assert_eq!(summary.assumes, assumes, "{name}: assume count");
        assert!(summary.entry_seeded, "{name}: entry not seeded");
    }
}

/// The CLI reads text and writes text; its output must parse back to the
/// same module so passes can be chained through pipes.
#[test]
fn instrumented_output_round_trips_as_text() {
    for (name, text) in FIXTURES {
        let module = instrumented(text);
        let printed = print_module(&module);
        let reparsed = parse_module(&printed)
            .unwrap_or_else(|e| panic!("{name}: instrumented output failed to parse: {e}"));
        assert_eq!(print_module(&reparsed), printed, "{name}: unstable text");
    }
}
