// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Verified-assertion promotion CLI tool
//!
//! Reads module text from stdin, promotes the assertion sites named by the
//! `VERIFIED_IDS` environment variable into trusted facts, restores the
//! entry point, and writes the result to stdout.
//!
//! Usage:
//!     VERIFIED_IDS=2,5 check-promote < test.ir > test_promoted.ir

use std::io::{self, Read};

use check_promote::{promote, VerifiedIds, VERIFIED_IDS_VAR};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Check for --help
    if args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("check-promote - verified assertion promotion tool");
        eprintln!();
        eprintln!("Usage: VERIFIED_IDS=1,7,8 check-promote < input.ir > output.ir");
        eprintln!();
        eprintln!("Reads the verified-ID set from ${VERIFIED_IDS_VAR} (unset means");
        eprintln!("empty: nothing is promoted, the entry point is still restored).");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --help, -h  Show this help message");
        std::process::exit(0);
    }

    // Read the verified-ID set from the environment
    let ids = match VerifiedIds::from_env() {
        Ok(ids) => ids,
        Err(e) => {
            eprintln!("Error in ${VERIFIED_IDS_VAR}: {e}");
            std::process::exit(1);
        }
    };

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

    // Promote
    promote(&mut module, &ids);

    // Write to stdout
    print!("{}", ir::print_module(&module));
}
