// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Value and storage types.

use std::fmt;

/// Type of a stored value or an allocation.
///
/// The scalar types are the usual fixed-width integers plus `ptr`, which is
/// an untyped 64-bit address. Arrays only describe storage (globals and
/// allocas); memory accesses themselves always move scalars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    I8,
    I16,
    I32,
    I64,
    Ptr,
    Array { elem: Box<Ty>, len: u64 },
}

impl Ty {
    /// Size of the type in bytes. The type set is padding-free, so this is
    /// both the store size of a value and the allocated size of a slot.
    ///
    /// Array sizes saturate at `u64::MAX` rather than overflowing; a type
    /// that large cannot be placed anyway, and the loader rejects it.
    pub fn size_bytes(&self) -> u64 {
        match self {
            Ty::I8 => 1,
            Ty::I16 => 2,
            Ty::I32 => 4,
            Ty::I64 | Ty::Ptr => 8,
            Ty::Array { elem, len } => elem.size_bytes().saturating_mul(*len),
        }
    }

    /// True for the scalar types that loads and stores can move.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Ty::Array { .. })
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::I8 => write!(f, "i8"),
            Ty::I16 => write!(f, "i16"),
            Ty::I32 => write!(f, "i32"),
            Ty::I64 => write!(f, "i64"),
            Ty::Ptr => write!(f, "ptr"),
            Ty::Array { elem, len } => write!(f, "[{len} x {elem}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_sizes() {
        assert_eq!(Ty::I8.size_bytes(), 1);
        assert_eq!(Ty::I16.size_bytes(), 2);
        assert_eq!(Ty::I32.size_bytes(), 4);
        assert_eq!(Ty::I64.size_bytes(), 8);
        assert_eq!(Ty::Ptr.size_bytes(), 8);
    }

    #[test]
    fn array_size_scales_by_len() {
        let ty = Ty::Array { elem: Box::new(Ty::I64), len: 10 };
        assert_eq!(ty.size_bytes(), 80);

        let nested = Ty::Array { elem: Box::new(ty), len: 3 };
        assert_eq!(nested.size_bytes(), 240);
    }

    #[test]
    fn absurd_array_sizes_saturate() {
        let ty = Ty::Array { elem: Box::new(Ty::I64), len: u64::MAX };
        assert_eq!(ty.size_bytes(), u64::MAX);

        let nested = Ty::Array { elem: Box::new(ty), len: 2 };
        assert_eq!(nested.size_bytes(), u64::MAX);
    }

    #[test]
    fn display_round_trips_shape() {
        let ty = Ty::Array { elem: Box::new(Ty::I32), len: 4 };
        assert_eq!(ty.to_string(), "[4 x i32]");
        assert_eq!(Ty::Ptr.to_string(), "ptr");
    }
}
