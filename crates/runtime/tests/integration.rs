// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the runtime
//!
//! These tests run complete programs from `tests/ir_samples/` through the
//! whole pipeline: parse, instrument, optionally promote, then execute.
//! They verify that:
//!
//! 1. Instrumented programs compute exactly what their plain forms compute
//! 2. Guards admit every in-bounds access and stop the first violation
//! 3. Promotion silences verified checks without changing results
//! 4. The native extern "C" guard aborts the process on violation
//!
//! Unlike unit tests (which use inline modules), these tests serve as
//! end-to-end validation of the pass pipeline on real programs.

use std::process::Command;

use bounds_instrument::instrument;
use check_promote::{promote, VerifiedIds};
use runtime::{Executor, Fault, ValidRegion, GLOBALS_BASE, HEAP_BASE, STACK_BASE};

const ENTRY_ARRAY_IR: &str = include_str!("../../../tests/ir_samples/entry_array.ir");
const HEAP_MIX_IR: &str = include_str!("../../../tests/ir_samples/heap_mix.ir");
const SORT_PAIRS_IR: &str = include_str!("../../../tests/ir_samples/sort_pairs.ir");
const CHAIN_IR: &str = include_str!("../../../tests/ir_samples/chain.ir");
const ASSERT_GRID_IR: &str = include_str!("../../../tests/ir_samples/assert_grid.ir");
const GLOBAL_SUM_IR: &str = include_str!("../../../tests/ir_samples/global_sum.ir");

/// Instrumentation must be behavior-preserving for well-behaved programs:
/// same return value, every guard verdict true.
#[test]
fn instrumentation_preserves_program_results() {
    let cases: [(&str, &str, u64); 4] = [
        ("heap_mix", HEAP_MIX_IR, 42),
        ("sort_pairs", SORT_PAIRS_IR, 1379),
        ("chain", CHAIN_IR, 15),
        ("global_sum", GLOBAL_SUM_IR, 78),
    ];
    for (name, text, expected) in cases {
        let plain = ir::parse_module(text).unwrap();
        let outcome = Executor::new(&plain).unwrap().run("entry").unwrap();
        assert_eq!(outcome.return_value(), Some(expected), "{name}: plain run");
        assert!(outcome.asserts.is_empty(), "{name}: plain run logged checks");

        let mut hardened = ir::parse_module(text).unwrap();
        let summary = instrument(&mut hardened);
        assert!(summary.guards > 0, "{name}: nothing was instrumented");
        assert!(summary.entry_seeded, "{name}: entry was not seeded");

        let outcome = Executor::new(&hardened).unwrap().run("entry").unwrap();
        assert_eq!(
            outcome.return_value(),
            Some(expected),
            "{name}: instrumented run changed the result"
        );
        assert!(!outcome.asserts.is_empty(), "{name}: no guard ever fired");
        assert!(
            outcome.asserts.iter().all(|&ok| ok),
            "{name}: an admissible access was rejected"
        );
    }
}

/// Runs the array program with the region pinned exactly to the array:
/// indices 0..9 complete untouched, index 10 faults on the first guard with
/// the limit sub-condition false.
#[test]
fn guards_admit_exactly_the_valid_indices() {
    let mut module = ir::parse_module(ENTRY_ARRAY_IR).unwrap();
    let summary = instrument(&mut module);
    assert_eq!(summary.guards, 2);

    let array = ValidRegion::new(STACK_BASE, STACK_BASE + 80).unwrap();
    let executor = Executor::new(&module).unwrap().with_region(array);

    for index in 0..10u64 {
        let outcome = executor.run_with_args("entry", &[index]).unwrap();
        assert_eq!(
            outcome.return_value(),
            Some(index),
            "index {index} should be admitted"
        );
        // Two guards (store, load), two sub-conditions each.
        assert_eq!(outcome.asserts, vec![true; 4]);
    }

    let outcome = executor.run_with_args("entry", &[10]).unwrap();
    assert_eq!(
        outcome.fault(),
        Some(&Fault::OutOfBounds {
            ptr: STACK_BASE + 80,
            size: 8,
            base_ok: true,
            limit_ok: false,
        })
    );
    // The store's guard reported and stopped the run; the load never ran.
    assert_eq!(outcome.asserts, vec![true, false]);
}

/// A region that stops at the heap base turns the first heap write of an
/// otherwise correct program into a fault.
#[test]
fn narrowed_region_stops_the_first_heap_write() {
    let mut module = ir::parse_module(CHAIN_IR).unwrap();
    instrument(&mut module);

    let data_only = ValidRegion::new(GLOBALS_BASE, HEAP_BASE).unwrap();
    let outcome = Executor::new(&module)
        .unwrap()
        .with_region(data_only)
        .run("entry")
        .unwrap();
    assert_eq!(
        outcome.fault(),
        Some(&Fault::OutOfBounds {
            ptr: HEAP_BASE,
            size: 8,
            base_ok: true,
            limit_ok: false,
        })
    );
}

/// Unpromoted, the grid program dies on site 4 (a constant-false
/// assertion). Promoting exactly that site turns it into a trusted fact and
/// the program completes, with the remaining five assertions still live.
#[test]
fn promotion_silences_verified_checks_without_changing_results() {
    let mut module = ir::parse_module(ASSERT_GRID_IR).unwrap();
    let outcome = Executor::new(&module).unwrap().run("entry").unwrap();
    assert_eq!(outcome.fault(), Some(&Fault::AssertFailed));
    assert_eq!(outcome.asserts, vec![true, true, true, false]);

    let ids = VerifiedIds::parse("4").unwrap();
    let summary = promote(&mut module, &ids);
    assert_eq!(summary.sites, 6);
    assert_eq!(summary.promoted, vec![4]);
    assert!(summary.entry_restored);

    let entry = module.function("entry").unwrap();
    assert_eq!(entry.linkage, ir::Linkage::External);
    assert!(!entry.optnone);

    let outcome = Executor::new(&module).unwrap().run("entry").unwrap();
    assert_eq!(outcome.return_value(), Some(3));
    assert_eq!(outcome.asserts, vec![true; 5]);
}

/// The two passes compose: instrumentation inserts its calls without
/// disturbing assertion numbering, and the promoted program still runs.
#[test]
fn instrument_then_promote_pipeline() {
    let mut module = ir::parse_module(ASSERT_GRID_IR).unwrap();
    let summary = instrument(&mut module);
    // Both defined functions become 1-byte objects seeded in entry.
    assert_eq!(summary.assumes, 2);

    let ids = VerifiedIds::parse("4").unwrap();
    let promotion = promote(&mut module, &ids);
    assert_eq!(promotion.sites, 6);
    assert_eq!(promotion.promoted, vec![4]);

    let outcome = Executor::new(&module).unwrap().run("entry").unwrap();
    assert_eq!(outcome.return_value(), Some(3));
    assert_eq!(outcome.asserts, vec![true; 5]);
}

/// Child half of `native_guard_aborts_on_violation`. Does nothing unless
/// spawned by the parent with the trigger variable set.
#[test]
fn native_guard_abort_victim() {
    if std::env::var("GUARD_ABORT_VICTIM").is_err() {
        return;
    }
    let region = ValidRegion::new(0x1000, 0x2000).unwrap();
    runtime::install(region).unwrap();
    runtime::__bounds_guard(0x4000 as *const std::ffi::c_void, 8);
    unreachable!("the violating guard must abort before this point");
}

/// The extern "C" guard is fail-stop: a violation takes the whole process
/// down, observed here through a child process exit status.
#[test]
fn native_guard_aborts_on_violation() {
    let exe = std::env::current_exe().unwrap();
    let status = Command::new(exe)
        .args(["native_guard_abort_victim", "--exact", "--nocapture"])
        .env("GUARD_ABORT_VICTIM", "1")
        .status()
        .unwrap();
    assert!(!status.success(), "violating guard must abort the child");
}
