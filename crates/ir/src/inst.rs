// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Instructions, operands, and terminators.

use std::fmt;

use crate::types::Ty;

/// Virtual register. Registers are function-local and hold one 64-bit word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg(pub u32);

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Index of a block within its function, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Instruction input: a register, an immediate, or the address of a named
/// global or function (`@name`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg),
    Imm(i64),
    Sym(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{r}"),
            Operand::Imm(v) => write!(f, "{v}"),
            Operand::Sym(name) => write!(f, "@{name}"),
        }
    }
}

/// Two's-complement binary operation. Arithmetic wraps; shift amounts are
/// taken modulo 64.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Sdiv,
    Srem,
    And,
    Or,
    Xor,
    Shl,
    Lshr,
    Ashr,
}

impl BinOp {
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Some(match s {
            "add" => BinOp::Add,
            "sub" => BinOp::Sub,
            "mul" => BinOp::Mul,
            "sdiv" => BinOp::Sdiv,
            "srem" => BinOp::Srem,
            "and" => BinOp::And,
            "or" => BinOp::Or,
            "xor" => BinOp::Xor,
            "shl" => BinOp::Shl,
            "lshr" => BinOp::Lshr,
            "ashr" => BinOp::Ashr,
            _ => return None,
        })
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Sdiv => "sdiv",
            BinOp::Srem => "srem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Shl => "shl",
            BinOp::Lshr => "lshr",
            BinOp::Ashr => "ashr",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Comparison predicate for `icmp`. Produces 1 or 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpPred {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl CmpPred {
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Some(match s {
            "eq" => CmpPred::Eq,
            "ne" => CmpPred::Ne,
            "slt" => CmpPred::Slt,
            "sle" => CmpPred::Sle,
            "sgt" => CmpPred::Sgt,
            "sge" => CmpPred::Sge,
            "ult" => CmpPred::Ult,
            "ule" => CmpPred::Ule,
            "ugt" => CmpPred::Ugt,
            "uge" => CmpPred::Uge,
            _ => return None,
        })
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            CmpPred::Eq => "eq",
            CmpPred::Ne => "ne",
            CmpPred::Slt => "slt",
            CmpPred::Sle => "sle",
            CmpPred::Sgt => "sgt",
            CmpPred::Sge => "sge",
            CmpPred::Ult => "ult",
            CmpPred::Ule => "ule",
            CmpPred::Ugt => "ugt",
            CmpPred::Uge => "uge",
        }
    }
}

impl fmt::Display for CmpPred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Atomic read-modify-write operation. The instruction yields the value the
/// location held before the update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RmwOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Xchg,
}

impl RmwOp {
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Some(match s {
            "add" => RmwOp::Add,
            "sub" => RmwOp::Sub,
            "and" => RmwOp::And,
            "or" => RmwOp::Or,
            "xor" => RmwOp::Xor,
            "xchg" => RmwOp::Xchg,
            _ => return None,
        })
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            RmwOp::Add => "add",
            RmwOp::Sub => "sub",
            RmwOp::And => "and",
            RmwOp::Or => "or",
            RmwOp::Xor => "xor",
            RmwOp::Xchg => "xchg",
        }
    }
}

impl fmt::Display for RmwOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Call target: a symbol (direct) or a register holding a function address
/// (indirect).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    Sym(String),
    Reg(Reg),
}

impl fmt::Display for Callee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callee::Sym(name) => write!(f, "@{name}"),
            Callee::Reg(r) => write!(f, "{r}"),
        }
    }
}

/// A memory access seen through the closed accessor view: the address
/// operand and the number of bytes touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemAccess<'a> {
    pub addr: &'a Operand,
    pub size: u64,
}

/// One non-terminator instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inst {
    Bin {
        dst: Reg,
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    },
    Cmp {
        dst: Reg,
        pred: CmpPred,
        lhs: Operand,
        rhs: Operand,
    },
    Load {
        dst: Reg,
        ty: Ty,
        addr: Operand,
    },
    Store {
        ty: Ty,
        value: Operand,
        addr: Operand,
    },
    AtomicRmw {
        dst: Reg,
        op: RmwOp,
        ty: Ty,
        addr: Operand,
        value: Operand,
    },
    CmpXchg {
        dst: Reg,
        ty: Ty,
        addr: Operand,
        expected: Operand,
        new: Operand,
    },
    /// Stack allocation: one `ty` when `count` is `None`, otherwise `count`
    /// elements of `ty`. Yields the address of the allocation.
    Alloca {
        dst: Reg,
        ty: Ty,
        count: Option<Operand>,
    },
    Call {
        dst: Option<Reg>,
        callee: Callee,
        args: Vec<Operand>,
    },
}

impl Inst {
    /// The address operand and byte size if this instruction reads or
    /// writes memory.
    ///
    /// This is the one place the instruction set answers "is this a memory
    /// access": loads, stores, and the two atomics, each sized by the type
    /// of the value moved. Calls are not accesses; the callee's own body is
    /// instrumented separately.
    pub fn mem_access(&self) -> Option<MemAccess<'_>> {
        match self {
            Inst::Load { ty, addr, .. }
            | Inst::Store { ty, addr, .. }
            | Inst::AtomicRmw { ty, addr, .. }
            | Inst::CmpXchg { ty, addr, .. } => Some(MemAccess {
                addr,
                size: ty.size_bytes(),
            }),
            _ => None,
        }
    }

    /// Register written by this instruction, if any.
    pub fn dst(&self) -> Option<Reg> {
        match self {
            Inst::Bin { dst, .. }
            | Inst::Cmp { dst, .. }
            | Inst::Load { dst, .. }
            | Inst::AtomicRmw { dst, .. }
            | Inst::CmpXchg { dst, .. }
            | Inst::Alloca { dst, .. } => Some(*dst),
            Inst::Store { .. } => None,
            Inst::Call { dst, .. } => *dst,
        }
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Bin { dst, op, lhs, rhs } => write!(f, "{dst} = {op} {lhs}, {rhs}"),
            Inst::Cmp { dst, pred, lhs, rhs } => write!(f, "{dst} = icmp {pred} {lhs}, {rhs}"),
            Inst::Load { dst, ty, addr } => write!(f, "{dst} = load {ty}, {addr}"),
            Inst::Store { ty, value, addr } => write!(f, "store {ty} {value}, {addr}"),
            Inst::AtomicRmw { dst, op, ty, addr, value } => {
                write!(f, "{dst} = atomicrmw {op} {ty} {addr}, {value}")
            }
            Inst::CmpXchg { dst, ty, addr, expected, new } => {
                write!(f, "{dst} = cmpxchg {ty} {addr}, {expected}, {new}")
            }
            Inst::Alloca { dst, ty, count } => match count {
                Some(count) => write!(f, "{dst} = alloca {ty}, {count}"),
                None => write!(f, "{dst} = alloca {ty}"),
            },
            Inst::Call { dst, callee, args } => {
                if let Some(dst) = dst {
                    write!(f, "{dst} = ")?;
                }
                write!(f, "call {callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Block terminator. Branch targets are block indices; the printer renders
/// them through the owning function's labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Jmp(BlockId),
    Br {
        cond: Operand,
        then_to: BlockId,
        else_to: BlockId,
    },
    Ret(Option<Operand>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_access_covers_exactly_the_four_access_kinds() {
        let addr = Operand::Reg(Reg(1));
        let load = Inst::Load { dst: Reg(2), ty: Ty::I32, addr: addr.clone() };
        let store = Inst::Store { ty: Ty::I8, value: Operand::Imm(0), addr: addr.clone() };
        let rmw = Inst::AtomicRmw {
            dst: Reg(2),
            op: RmwOp::Add,
            ty: Ty::I64,
            addr: addr.clone(),
            value: Operand::Imm(1),
        };
        let cas = Inst::CmpXchg {
            dst: Reg(2),
            ty: Ty::I16,
            addr: addr.clone(),
            expected: Operand::Imm(0),
            new: Operand::Imm(1),
        };

        assert_eq!(load.mem_access().map(|a| a.size), Some(4));
        assert_eq!(store.mem_access().map(|a| a.size), Some(1));
        assert_eq!(rmw.mem_access().map(|a| a.size), Some(8));
        assert_eq!(cas.mem_access().map(|a| a.size), Some(2));

        let alloca = Inst::Alloca { dst: Reg(0), ty: Ty::I64, count: None };
        let call = Inst::Call {
            dst: None,
            callee: Callee::Sym("f".into()),
            args: vec![addr],
        };
        assert!(alloca.mem_access().is_none());
        assert!(call.mem_access().is_none());
    }

    #[test]
    fn display_forms() {
        let inst = Inst::Bin {
            dst: Reg(3),
            op: BinOp::Mul,
            lhs: Operand::Reg(Reg(1)),
            rhs: Operand::Imm(8),
        };
        assert_eq!(inst.to_string(), "%3 = mul %1, 8");

        let call = Inst::Call {
            dst: Some(Reg(4)),
            callee: Callee::Sym("malloc".into()),
            args: vec![Operand::Imm(80)],
        };
        assert_eq!(call.to_string(), "%4 = call @malloc(80)");

        let guard = Inst::Call {
            dst: None,
            callee: Callee::Sym("__bounds_guard".into()),
            args: vec![Operand::Reg(Reg(2)), Operand::Imm(8)],
        };
        assert_eq!(guard.to_string(), "call @__bounds_guard(%2, 8)");
    }
}
