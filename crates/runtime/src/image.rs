// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Guest memory layout and module images.
//!
//! The layout is fixed and deterministic so that hosts (and tests) can
//! predict every address a module will use:
//!
//! ```text
//! 0x0_0000  null page            never mapped; all access faults
//! 0x0_1000  function table       one byte per module function
//! 0x0_2000  globals              declaration order, 8-byte aligned
//! 0x4_0000  stack                grows upward, frame-reset on return
//! 0x8_0000  heap                 bump-allocated, never reused
//! ```
//!
//! An [`Image`] is the load-time half of execution: globals placed and
//! initialized, symbols resolved to addresses, functions given addresses so
//! they can be compared and called indirectly. The executor clones the
//! image's memory for each run, so one image serves any number of runs.

use std::collections::HashMap;

use ir::Module;

use crate::error::{RuntimeError, RuntimeResult};

/// Everything below this address faults, even for raw (unguarded) access.
pub const FUNC_TABLE_BASE: u64 = 0x1000;
/// First global lands here.
pub const GLOBALS_BASE: u64 = 0x2000;
/// Stack allocations start here and grow toward the heap.
pub const STACK_BASE: u64 = 0x4_0000;
/// Heap allocations start here and grow toward the end of memory.
pub const HEAP_BASE: u64 = 0x8_0000;
/// Default guest memory size: 1 MiB.
pub const DEFAULT_MEMORY: usize = 1 << 20;

/// A module loaded into a concrete memory layout.
#[derive(Debug)]
pub struct Image {
    pub(crate) mem: Vec<u8>,
    symbols: HashMap<String, u64>,
    functions: usize,
}

impl Image {
    pub fn build(module: &Module, memory: usize) -> RuntimeResult<Image> {
        let needed = HEAP_BASE as usize + 0x1000;
        if memory < needed {
            return Err(RuntimeError::MemoryTooSmall { size: memory, needed });
        }
        let mut mem = vec![0u8; memory];
        let mut symbols = HashMap::new();

        for (i, f) in module.functions.iter().enumerate() {
            let addr = FUNC_TABLE_BASE + i as u64;
            if addr >= GLOBALS_BASE {
                return Err(RuntimeError::GlobalsTooLarge {
                    needed: addr - FUNC_TABLE_BASE + 1,
                    available: GLOBALS_BASE - FUNC_TABLE_BASE,
                });
            }
            if symbols.insert(f.name.clone(), addr).is_some() {
                return Err(RuntimeError::DuplicateSymbol { symbol: f.name.clone() });
            }
        }

        let mut cursor = GLOBALS_BASE;
        for g in &module.globals {
            let size = g.ty.size_bytes();
            let padded = size.saturating_add(7) & !7;
            let end = match cursor.checked_add(padded) {
                Some(end) if end <= STACK_BASE => end,
                _ => {
                    return Err(RuntimeError::GlobalsTooLarge {
                        needed: (cursor - GLOBALS_BASE).saturating_add(padded),
                        available: STACK_BASE - GLOBALS_BASE,
                    })
                }
            };
            if let Some(v) = g.init {
                let bytes = v.to_le_bytes();
                let n = (size as usize).min(8);
                mem[cursor as usize..cursor as usize + n].copy_from_slice(&bytes[..n]);
            }
            if symbols.insert(g.name.clone(), cursor).is_some() {
                return Err(RuntimeError::DuplicateSymbol { symbol: g.name.clone() });
            }
            cursor = end;
        }

        Ok(Image {
            mem,
            symbols,
            functions: module.functions.len(),
        })
    }

    /// Address of a global or function, if the module declares it.
    pub fn symbol(&self, name: &str) -> Option<u64> {
        self.symbols.get(name).copied()
    }

    /// Reverse of the function table: which function does `addr` name?
    pub(crate) fn function_at(&self, addr: u64) -> Option<usize> {
        if addr >= FUNC_TABLE_BASE && addr < FUNC_TABLE_BASE + self.functions as u64 {
            Some((addr - FUNC_TABLE_BASE) as usize)
        } else {
            None
        }
    }

    pub fn memory_len(&self) -> usize {
        self.mem.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use ir::parse_module;

    #[test]
    fn layout_is_deterministic() {
        let module = parse_module(indoc! {"
            global a: i64 = -1
            global b: i8
            global c: [4 x i32]

            fn entry() {
            bb0:
              ret
            }

            declare shim(%0)
        "})
        .unwrap();
        let image = Image::build(&module, DEFAULT_MEMORY).unwrap();

        assert_eq!(image.symbol("entry"), Some(FUNC_TABLE_BASE));
        assert_eq!(image.symbol("shim"), Some(FUNC_TABLE_BASE + 1));
        assert_eq!(image.symbol("a"), Some(GLOBALS_BASE));
        // i8 still takes an aligned 8-byte slot.
        assert_eq!(image.symbol("b"), Some(GLOBALS_BASE + 8));
        assert_eq!(image.symbol("c"), Some(GLOBALS_BASE + 16));
        assert_eq!(image.symbol("missing"), None);

        assert_eq!(image.function_at(FUNC_TABLE_BASE), Some(0));
        assert_eq!(image.function_at(FUNC_TABLE_BASE + 1), Some(1));
        assert_eq!(image.function_at(FUNC_TABLE_BASE + 2), None);
        assert_eq!(image.function_at(0), None);
    }

    #[test]
    fn initializers_are_written_little_endian() {
        let module = parse_module("global x: i64 = 258\nglobal y: i8 = -1\n").unwrap();
        let image = Image::build(&module, DEFAULT_MEMORY).unwrap();
        let x = GLOBALS_BASE as usize;
        assert_eq!(&image.mem[x..x + 8], &[2, 1, 0, 0, 0, 0, 0, 0]);
        // Narrow globals truncate their initializer to the declared width.
        assert_eq!(image.mem[x + 8], 0xff);
        assert_eq!(image.mem[x + 9], 0);
    }

    #[test]
    fn rejects_symbol_collisions() {
        let module = parse_module(indoc! {"
            global entry: i64

            fn entry() {
            bb0:
              ret
            }
        "})
        .unwrap();
        assert_eq!(
            Image::build(&module, DEFAULT_MEMORY).unwrap_err(),
            RuntimeError::DuplicateSymbol { symbol: "entry".into() }
        );
    }

    #[test]
    fn rejects_undersized_memory() {
        let module = parse_module("fn entry() {\nbb0:\n  ret\n}\n").unwrap();
        assert!(matches!(
            Image::build(&module, 0x1000).unwrap_err(),
            RuntimeError::MemoryTooSmall { .. }
        ));
    }

    #[test]
    fn rejects_globals_overflowing_their_window() {
        // One global bigger than the whole globals window.
        let module = parse_module("global big: [100000 x i64]\n").unwrap();
        assert!(matches!(
            Image::build(&module, DEFAULT_MEMORY).unwrap_err(),
            RuntimeError::GlobalsTooLarge { .. }
        ));

        // A length that overflows the byte-size computation entirely still
        // ends in the same error, not a panic.
        let module = parse_module("global huge: [9999999999999999999 x i64]\n").unwrap();
        assert!(matches!(
            Image::build(&module, DEFAULT_MEMORY).unwrap_err(),
            RuntimeError::GlobalsTooLarge { .. }
        ));
    }
}
