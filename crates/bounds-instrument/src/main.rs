// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bounds instrumentation CLI tool
//!
//! Reads module text from stdin, inserts bounds guards and allocation
//! assumptions, and writes the instrumented module to stdout.
//!
//! Usage:
//!     cat test.ir | bounds-instrument > test_instrumented.ir

use std::io::{self, Read};

use bounds_instrument::instrument;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Check for --help
    if args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("bounds-instrument - memory access instrumentation tool");
        eprintln!();
        eprintln!("Usage: cat input.ir | bounds-instrument > output.ir");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --help, -h  Show this help message");
        std::process::exit(0);
    }

    // Read input from stdin
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        eprintln!("Error reading stdin: {e}");
        std::process::exit(1);
    }

    // Parse the module
    let mut module = match ir::parse_module(&input) {
        Ok(module) => module,
        Err(e) => {
            eprintln!("Parse error: {e}");
            std::process::exit(1);
        }
    };

    // Instrument
    instrument(&mut module);

    // Write to stdout
    print!("{}", ir::print_module(&module));
}
