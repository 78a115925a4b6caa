// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The valid region: one contiguous address range everything lives in.
//!
//! The enforcement model has exactly one region per process, populated by
//! the loader before guarded code runs and immutable afterwards. A guarded
//! access is admissible iff it lies entirely inside the region; the two
//! halves of that predicate (at-or-above base, end-within limit) are kept
//! separate so they can be reported individually to the assertion log and
//! analyzed as the same two facts a verifier sees.

use std::sync::OnceLock;

use crate::error::{RuntimeError, RuntimeResult};

/// Half-open address range `[base, limit)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidRegion {
    base: u64,
    limit: u64,
}

/// Truth values of the two admissibility conditions for one access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Check {
    pub base_ok: bool,
    pub limit_ok: bool,
}

impl Check {
    pub fn ok(self) -> bool {
        self.base_ok && self.limit_ok
    }
}

impl ValidRegion {
    pub fn new(base: u64, limit: u64) -> RuntimeResult<Self> {
        if base > limit {
            return Err(RuntimeError::ReversedRegion { base, limit });
        }
        Ok(Self { base, limit })
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Evaluate an access of `size` bytes at `ptr`.
    ///
    /// A zero-sized access touches nothing and passes anywhere. The end
    /// address is computed with overflow detection; an access that wraps
    /// the address space fails the limit condition.
    pub fn check(&self, ptr: u64, size: u64) -> Check {
        if size == 0 {
            return Check { base_ok: true, limit_ok: true };
        }
        Check {
            base_ok: ptr >= self.base,
            limit_ok: match ptr.checked_add(size) {
                Some(end) => end <= self.limit,
                None => false,
            },
        }
    }

    pub fn contains(&self, ptr: u64, size: u64) -> bool {
        self.check(ptr, size).ok()
    }
}

static INSTALLED: OnceLock<ValidRegion> = OnceLock::new();

/// Install the process-wide region enforced by the C-callable guard.
///
/// One shot: once a region is installed it stays installed for the life of
/// the process, and concurrent guards read it without further
/// synchronization.
pub fn install(region: ValidRegion) -> RuntimeResult<()> {
    INSTALLED
        .set(region)
        .map_err(|_| RuntimeError::RegionAlreadyInstalled)
}

/// The installed process-wide region, if any.
pub fn installed() -> Option<ValidRegion> {
    INSTALLED.get().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reversed_bounds() {
        assert_eq!(
            ValidRegion::new(0x2000, 0x1000).unwrap_err(),
            RuntimeError::ReversedRegion { base: 0x2000, limit: 0x1000 }
        );
        // Empty regions are fine; nothing fits in them.
        let empty = ValidRegion::new(0x1000, 0x1000).unwrap();
        assert!(!empty.contains(0x1000, 1));
        assert!(empty.contains(0x1000, 0));
    }

    #[test]
    fn boundary_accesses() {
        let r = ValidRegion::new(0x1000, 0x2000).unwrap();

        // Zero-size probes never fail, even at the base itself.
        assert!(r.contains(0x1000, 0));

        // One byte below base fails only the base condition.
        let c = r.check(0x0fff, 1);
        assert!(!c.base_ok);
        assert!(c.limit_ok);
        assert!(!c.ok());

        // Last byte of the region is admissible.
        assert!(r.contains(0x1fff, 1));

        // First byte past the region fails only the limit condition.
        let c = r.check(0x2000, 1);
        assert!(c.base_ok);
        assert!(!c.limit_ok);

        // An access straddling the limit fails even though it starts inside.
        assert!(!r.contains(0x1ffc, 8));
        assert!(r.contains(0x1ff8, 8));
    }

    #[test]
    fn wraparound_fails_the_limit_condition() {
        let r = ValidRegion::new(0x1000, u64::MAX).unwrap();
        let c = r.check(u64::MAX - 1, 4);
        assert!(c.base_ok);
        assert!(!c.limit_ok);
    }

    #[test]
    fn install_is_one_shot() {
        let region = ValidRegion::new(0x1000, 0x2000).unwrap();
        // Another test in this process may have installed first; either
        // way the second install must report the conflict.
        let _ = install(region);
        assert_eq!(
            install(region).unwrap_err(),
            RuntimeError::RegionAlreadyInstalled
        );
        assert_eq!(installed(), Some(region));
    }
}
