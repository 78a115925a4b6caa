// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Module loader and runner
//!
//! Reads module text from a file argument (or stdin), loads it into the
//! guest layout, executes `entry`, and reports how the run ended.
//!
//! Usage:
//!     loader test.ir
//!     cat test.ir | loader --region 0x2000:0x40000 --steps 10000

use std::io::{self, Read};
use std::process::exit;

use runtime::{ExecStatus, Executor, ValidRegion};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Check for --help
    if args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("loader - run an instrumented module");
        eprintln!();
        eprintln!("Usage: loader [OPTIONS] [FILE]");
        eprintln!();
        eprintln!("Reads module text from FILE (or stdin) and executes `entry`.");
        eprintln!("Exits 0 when the run completes, 1 on a fault or error.");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --region BASE:LIMIT  Guard region (hex or decimal addresses)");
        eprintln!("  --steps N            Step limit for the run");
        eprintln!("  --help, -h           Show this help message");
        exit(0);
    }

    let mut region = None;
    let mut steps = None;
    let mut file = None;
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--region" => match it.next().and_then(|v| parse_region(v)) {
                Some(r) => region = Some(r),
                None => {
                    eprintln!("Error: --region expects BASE:LIMIT");
                    exit(1);
                }
            },
            "--steps" => match it.next().and_then(|v| parse_num(v)) {
                Some(n) => steps = Some(n),
                None => {
                    eprintln!("Error: --steps expects a number");
                    exit(1);
                }
            },
            _ if file.is_none() && !arg.starts_with('-') => file = Some(arg.clone()),
            _ => {
                eprintln!("Error: unknown argument `{arg}`");
                exit(1);
            }
        }
    }

    // Read input from the file argument, or stdin when there is none
    let input = match &file {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Error reading {path}: {e}");
                exit(1);
            }
        },
        None => {
            let mut buf = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buf) {
                eprintln!("Error reading stdin: {e}");
                exit(1);
            }
            buf
        }
    };

    // Parse the module
    let module = match ir::parse_module(&input) {
        Ok(module) => module,
        Err(e) => {
            eprintln!("Parse error: {e}");
            exit(1);
        }
    };

    // Load
    let mut executor = match Executor::new(&module) {
        Ok(executor) => executor,
        Err(e) => {
            eprintln!("Load error: {e}");
            exit(1);
        }
    };
    if let Some((base, limit)) = region {
        match ValidRegion::new(base, limit) {
            Ok(r) => executor = executor.with_region(r),
            Err(e) => {
                eprintln!("Error: {e}");
                exit(1);
            }
        }
    }
    if let Some(n) = steps {
        executor = executor.with_step_limit(n);
    }

    // Run
    let outcome = match executor.run("entry") {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Run error: {e}");
            exit(1);
        }
    };
    match &outcome.status {
        ExecStatus::Completed(Some(v)) => {
            println!("entry completed: {v} ({} steps)", outcome.steps)
        }
        ExecStatus::Completed(None) => println!("entry completed ({} steps)", outcome.steps),
        ExecStatus::Faulted(fault) => {
            println!("entry faulted: {fault} ({} steps)", outcome.steps);
            exit(1);
        }
    }
}

/// Accepts `0x`-prefixed hex or plain decimal.
fn parse_num(s: &str) -> Option<u64> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

fn parse_region(s: &str) -> Option<(u64, u64)> {
    let (base, limit) = s.split_once(':')?;
    Some((parse_num(base)?, parse_num(limit)?))
}
