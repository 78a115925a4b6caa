// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-process executor.
//!
//! [`Executor`] runs a function from a loaded module against a fresh copy of
//! the image's memory, so every run starts from the same initial state. Two
//! failure channels are kept apart on purpose:
//!
//! - [`RuntimeError`] (the `Err` of [`Executor::run`]) is a host-side
//!   problem: the symbol does not exist, is a declaration, or was called
//!   with the wrong number of arguments. Nothing executed.
//! - [`Fault`] (inside [`RunOutcome`]) is the guest tripping an enforcement
//!   check or exhausting a budget mid-run. The run itself succeeded at
//!   telling us precisely how the guest failed.
//!
//! Every instruction and terminator costs one step against the step limit.
//! Bounds guards and assertions append their verdicts to
//! [`RunOutcome::asserts`] in execution order, which is how tests observe
//! which checks actually fired.

use std::collections::HashMap;

use lazy_static::lazy_static;

use ir::{names, BinOp, Callee, CmpPred, Inst, Module, Operand, RmwOp, Term};

use crate::error::{RuntimeError, RuntimeResult};
use crate::fault::Fault;
use crate::image::{Image, DEFAULT_MEMORY, FUNC_TABLE_BASE, GLOBALS_BASE, HEAP_BASE, STACK_BASE};
use crate::region::ValidRegion;

/// Steps a run may take before faulting with [`Fault::OutOfFuel`].
pub const DEFAULT_STEP_LIMIT: u64 = 1 << 20;
/// Nested calls a run may make before faulting with
/// [`Fault::CallDepthExceeded`].
pub const DEFAULT_CALL_DEPTH: usize = 128;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecStatus {
    /// The function returned; carries its return value if it had one.
    Completed(Option<u64>),
    Faulted(Fault),
}

/// The result of one run: terminal status, steps consumed, and the verdict
/// of every guard sub-condition and assertion evaluated along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: ExecStatus,
    pub steps: u64,
    pub asserts: Vec<bool>,
}

impl RunOutcome {
    pub fn completed(&self) -> bool {
        matches!(self.status, ExecStatus::Completed(_))
    }

    pub fn return_value(&self) -> Option<u64> {
        match self.status {
            ExecStatus::Completed(v) => v,
            ExecStatus::Faulted(_) => None,
        }
    }

    pub fn fault(&self) -> Option<&Fault> {
        match &self.status {
            ExecStatus::Faulted(f) => Some(f),
            ExecStatus::Completed(_) => None,
        }
    }
}

/// Behavior bound to a well-known callee name when the module does not
/// define the name itself.
#[derive(Debug, Clone, Copy)]
enum Builtin {
    Guard,
    Assume,
    Assert,
    Trust,
    Malloc,
    Calloc,
    Realloc,
    Free,
}

lazy_static! {
    static ref BUILTINS: HashMap<&'static str, Builtin> = {
        let mut m = HashMap::new();
        m.insert(names::GUARD, Builtin::Guard);
        m.insert(names::ASSUME, Builtin::Assume);
        m.insert(names::VERIFIER_ASSERT, Builtin::Assert);
        m.insert(names::TRUST, Builtin::Trust);
        m.insert(names::MALLOC, Builtin::Malloc);
        m.insert(names::CALLOC, Builtin::Calloc);
        m.insert(names::REALLOC, Builtin::Realloc);
        m.insert(names::FREE, Builtin::Free);
        m
    };
}

/// Executes functions of one module against a fixed image and region.
///
/// The executor is immutable once built; each call to [`Executor::run`]
/// works on its own copy of memory, so runs never observe each other.
pub struct Executor<'m> {
    module: &'m Module,
    image: Image,
    region: ValidRegion,
    step_limit: u64,
    call_depth: usize,
}

impl<'m> Executor<'m> {
    /// Build an executor with the default memory size and a region covering
    /// everything from the globals base to the end of memory.
    pub fn new(module: &'m Module) -> RuntimeResult<Self> {
        Self::with_memory(module, DEFAULT_MEMORY)
    }

    pub fn with_memory(module: &'m Module, memory: usize) -> RuntimeResult<Self> {
        let image = Image::build(module, memory)?;
        let region = ValidRegion::new(GLOBALS_BASE, memory as u64)?;
        Ok(Executor {
            module,
            image,
            region,
            step_limit: DEFAULT_STEP_LIMIT,
            call_depth: DEFAULT_CALL_DEPTH,
        })
    }

    /// Narrow (or widen) the region guards check against.
    pub fn with_region(mut self, region: ValidRegion) -> Self {
        self.region = region;
        self
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn with_call_depth(mut self, depth: usize) -> Self {
        self.call_depth = depth;
        self
    }

    pub fn region(&self) -> ValidRegion {
        self.region
    }

    /// Address of a global or function in the guest layout.
    pub fn symbol(&self, name: &str) -> Option<u64> {
        self.image.symbol(name)
    }

    pub fn run(&self, name: &str) -> RuntimeResult<RunOutcome> {
        self.run_with_args(name, &[])
    }

    /// Run `name` with `args` bound to `%0, %1, ...`. The argument count
    /// must match the function's parameter count exactly; calls made by the
    /// guest itself are padded with zeros instead.
    pub fn run_with_args(&self, name: &str, args: &[u64]) -> RuntimeResult<RunOutcome> {
        let (index, f) = self
            .module
            .functions
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
            .ok_or_else(|| RuntimeError::SymbolNotFound { symbol: name.to_string() })?;
        if f.is_declaration() {
            return Err(RuntimeError::NotDefined { name: name.to_string() });
        }
        if args.len() != f.params as usize {
            return Err(RuntimeError::WrongArity {
                name: name.to_string(),
                expects: f.params,
                got: args.len(),
            });
        }

        let mut machine = Machine {
            ex: self,
            mem: self.image.mem.clone(),
            sp: STACK_BASE,
            hp: HEAP_BASE,
            allocs: HashMap::new(),
            steps: 0,
            asserts: Vec::new(),
        };
        let status = match machine.call(index, args, 0) {
            Ok(value) => ExecStatus::Completed(value),
            Err(fault) => ExecStatus::Faulted(fault),
        };
        Ok(RunOutcome {
            status,
            steps: machine.steps,
            asserts: machine.asserts,
        })
    }
}

/// Per-run interpreter state. Dropped when the run ends; the outcome carries
/// everything the host is allowed to see.
struct Machine<'a, 'm> {
    ex: &'a Executor<'m>,
    mem: Vec<u8>,
    /// Stack cursor; grows toward [`HEAP_BASE`], restored per frame.
    sp: u64,
    /// Heap cursor; grows toward the end of memory, never restored.
    hp: u64,
    /// Size of each heap block, for `realloc` copies.
    allocs: HashMap<u64, u64>,
    steps: u64,
    asserts: Vec<bool>,
}

enum Target {
    Defined(usize),
    Builtin(Builtin),
}

impl Machine<'_, '_> {
    fn call(&mut self, index: usize, args: &[u64], depth: usize) -> Result<Option<u64>, Fault> {
        if depth >= self.ex.call_depth {
            return Err(Fault::CallDepthExceeded);
        }
        let module = self.ex.module;
        let f = &module.functions[index];
        let mut regs = vec![0u64; f.next_reg.max(f.params) as usize];
        let bound = args.len().min(regs.len());
        regs[..bound].copy_from_slice(&args[..bound]);

        let frame_sp = self.sp;
        let mut block = 0usize;
        loop {
            let b = &f.blocks[block];
            for inst in &b.insts {
                self.step()?;
                self.exec(inst, &mut regs, depth)?;
            }
            self.step()?;
            match &b.term {
                Term::Jmp(to) => block = to.index(),
                Term::Br { cond, then_to, else_to } => {
                    block = if self.value(cond, &regs)? != 0 {
                        then_to.index()
                    } else {
                        else_to.index()
                    };
                }
                Term::Ret(value) => {
                    let out = match value {
                        Some(op) => Some(self.value(op, &regs)?),
                        None => None,
                    };
                    self.sp = frame_sp;
                    return Ok(out);
                }
            }
        }
    }

    fn exec(&mut self, inst: &Inst, regs: &mut Vec<u64>, depth: usize) -> Result<(), Fault> {
        match inst {
            Inst::Bin { dst, op, lhs, rhs } => {
                let a = self.value(lhs, regs)?;
                let b = self.value(rhs, regs)?;
                set(regs, dst.0, binop(*op, a, b)?);
            }
            Inst::Cmp { dst, pred, lhs, rhs } => {
                let a = self.value(lhs, regs)?;
                let b = self.value(rhs, regs)?;
                set(regs, dst.0, compare(*pred, a, b) as u64);
            }
            Inst::Load { dst, ty, addr } => {
                let addr = self.value(addr, regs)?;
                let v = self.load(addr, ty.size_bytes())?;
                set(regs, dst.0, v);
            }
            Inst::Store { ty, value, addr } => {
                let v = self.value(value, regs)?;
                let addr = self.value(addr, regs)?;
                self.store(addr, ty.size_bytes(), v)?;
            }
            Inst::AtomicRmw { dst, op, ty, addr, value } => {
                let v = self.value(value, regs)?;
                let addr = self.value(addr, regs)?;
                let size = ty.size_bytes();
                let old = self.load(addr, size)?;
                let new = match op {
                    RmwOp::Add => old.wrapping_add(v),
                    RmwOp::Sub => old.wrapping_sub(v),
                    RmwOp::And => old & v,
                    RmwOp::Or => old | v,
                    RmwOp::Xor => old ^ v,
                    RmwOp::Xchg => v,
                };
                self.store(addr, size, new)?;
                set(regs, dst.0, old);
            }
            Inst::CmpXchg { dst, ty, addr, expected, new } => {
                let expected = self.value(expected, regs)?;
                let new = self.value(new, regs)?;
                let addr = self.value(addr, regs)?;
                let size = ty.size_bytes();
                let old = self.load(addr, size)?;
                if old == expected {
                    self.store(addr, size, new)?;
                }
                set(regs, dst.0, old);
            }
            Inst::Alloca { dst, ty, count } => {
                let n = match count {
                    Some(op) => self.value(op, regs)?,
                    None => 1,
                };
                let addr = self.alloca(ty.size_bytes().wrapping_mul(n))?;
                set(regs, dst.0, addr);
            }
            Inst::Call { dst, callee, args } => {
                let mut vals = Vec::with_capacity(args.len());
                for arg in args {
                    vals.push(self.value(arg, regs)?);
                }
                let ret = match callee {
                    Callee::Sym(name) => match self.resolve(name)? {
                        Target::Defined(index) => self.call(index, &vals, depth + 1)?,
                        Target::Builtin(b) => self.builtin(b, &vals)?,
                    },
                    Callee::Reg(r) => {
                        let addr = regs.get(r.0 as usize).copied().unwrap_or(0);
                        let index = self
                            .ex
                            .image
                            .function_at(addr)
                            .filter(|&i| !self.ex.module.functions[i].is_declaration())
                            .ok_or(Fault::BadFunctionPointer(addr))?;
                        self.call(index, &vals, depth + 1)?
                    }
                };
                if let Some(dst) = dst {
                    // Using the result of a void callee reads as zero.
                    set(regs, dst.0, ret.unwrap_or(0));
                }
            }
        }
        Ok(())
    }

    /// Defined module functions win over builtins; declarations do not.
    fn resolve(&self, name: &str) -> Result<Target, Fault> {
        if let Some((index, f)) = self
            .ex
            .module
            .functions
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
        {
            if !f.is_declaration() {
                return Ok(Target::Defined(index));
            }
        }
        match BUILTINS.get(name) {
            Some(b) => Ok(Target::Builtin(*b)),
            None => Err(Fault::UndefinedSymbol(name.to_string())),
        }
    }

    fn builtin(&mut self, b: Builtin, args: &[u64]) -> Result<Option<u64>, Fault> {
        let arg = |i: usize| args.get(i).copied().unwrap_or(0);
        match b {
            Builtin::Guard => {
                let (ptr, size) = (arg(0), arg(1));
                let check = self.ex.region.check(ptr, size);
                self.asserts.push(check.base_ok);
                self.asserts.push(check.limit_ok);
                if !check.ok() {
                    return Err(Fault::OutOfBounds {
                        ptr,
                        size,
                        base_ok: check.base_ok,
                        limit_ok: check.limit_ok,
                    });
                }
                Ok(None)
            }
            Builtin::Assume | Builtin::Trust | Builtin::Free => Ok(None),
            Builtin::Assert => {
                let truth = arg(0) != 0;
                self.asserts.push(truth);
                if truth {
                    Ok(None)
                } else {
                    Err(Fault::AssertFailed)
                }
            }
            Builtin::Malloc => Ok(Some(self.malloc(arg(0)))),
            Builtin::Calloc => Ok(Some(self.malloc(arg(0).wrapping_mul(arg(1))))),
            Builtin::Realloc => Ok(Some(self.realloc(arg(0), arg(1)))),
        }
    }

    /// Bump allocation. Memory is never reused, so fresh blocks are always
    /// zeroed; exhaustion returns the null address rather than faulting.
    fn malloc(&mut self, size: u64) -> u64 {
        let addr = align8(self.hp);
        let end = match addr.checked_add(size) {
            Some(end) if end <= self.mem.len() as u64 => end,
            _ => return 0,
        };
        self.hp = end;
        self.allocs.insert(addr, size);
        addr
    }

    fn realloc(&mut self, old: u64, size: u64) -> u64 {
        let new = self.malloc(size);
        if new != 0 && old != 0 {
            let copy = self.allocs.get(&old).copied().unwrap_or(0).min(size) as usize;
            if copy > 0 {
                self.mem.copy_within(old as usize..old as usize + copy, new as usize);
            }
        }
        new
    }

    fn alloca(&mut self, size: u64) -> Result<u64, Fault> {
        let addr = align8(self.sp);
        let end = addr.checked_add(size).ok_or(Fault::StackExhausted)?;
        if end > HEAP_BASE {
            return Err(Fault::StackExhausted);
        }
        self.sp = end;
        Ok(addr)
    }

    /// Raw accessibility, independent of the guarded region: anything inside
    /// memory and above the null page.
    fn check_raw(&self, addr: u64, size: u64) -> Result<(), Fault> {
        if size == 0 {
            return Ok(());
        }
        let in_range = addr >= FUNC_TABLE_BASE
            && matches!(addr.checked_add(size), Some(end) if end <= self.mem.len() as u64);
        if in_range {
            Ok(())
        } else {
            Err(Fault::WildAccess { ptr: addr, size })
        }
    }

    /// Little-endian load, zero-extended to a word.
    fn load(&self, addr: u64, size: u64) -> Result<u64, Fault> {
        self.check_raw(addr, size)?;
        let at = addr as usize;
        let n = (size as usize).min(8);
        let mut buf = [0u8; 8];
        buf[..n].copy_from_slice(&self.mem[at..at + n]);
        Ok(u64::from_le_bytes(buf))
    }

    /// Little-endian store, truncated to `size` bytes.
    fn store(&mut self, addr: u64, size: u64, value: u64) -> Result<(), Fault> {
        self.check_raw(addr, size)?;
        let at = addr as usize;
        let n = (size as usize).min(8);
        self.mem[at..at + n].copy_from_slice(&value.to_le_bytes()[..n]);
        Ok(())
    }

    fn value(&self, op: &Operand, regs: &[u64]) -> Result<u64, Fault> {
        match op {
            Operand::Reg(r) => Ok(regs.get(r.0 as usize).copied().unwrap_or(0)),
            Operand::Imm(v) => Ok(*v as u64),
            Operand::Sym(name) => self
                .ex
                .image
                .symbol(name)
                .ok_or_else(|| Fault::UndefinedSymbol(name.clone())),
        }
    }

    fn step(&mut self) -> Result<(), Fault> {
        if self.steps >= self.ex.step_limit {
            return Err(Fault::OutOfFuel);
        }
        self.steps += 1;
        Ok(())
    }
}

fn set(regs: &mut Vec<u64>, index: u32, value: u64) {
    let index = index as usize;
    if index >= regs.len() {
        regs.resize(index + 1, 0);
    }
    regs[index] = value;
}

fn align8(n: u64) -> u64 {
    n.wrapping_add(7) & !7
}

fn binop(op: BinOp, a: u64, b: u64) -> Result<u64, Fault> {
    Ok(match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Sdiv => {
            if b == 0 {
                return Err(Fault::DivideByZero);
            }
            (a as i64).wrapping_div(b as i64) as u64
        }
        BinOp::Srem => {
            if b == 0 {
                return Err(Fault::DivideByZero);
            }
            (a as i64).wrapping_rem(b as i64) as u64
        }
        BinOp::And => a & b,
        BinOp::Or => a | b,
        BinOp::Xor => a ^ b,
        BinOp::Shl => a.wrapping_shl((b & 63) as u32),
        BinOp::Lshr => a.wrapping_shr((b & 63) as u32),
        BinOp::Ashr => ((a as i64).wrapping_shr((b & 63) as u32)) as u64,
    })
}

fn compare(pred: CmpPred, a: u64, b: u64) -> bool {
    let (sa, sb) = (a as i64, b as i64);
    match pred {
        CmpPred::Eq => a == b,
        CmpPred::Ne => a != b,
        CmpPred::Slt => sa < sb,
        CmpPred::Sle => sa <= sb,
        CmpPred::Sgt => sa > sb,
        CmpPred::Sge => sa >= sb,
        CmpPred::Ult => a < b,
        CmpPred::Ule => a <= b,
        CmpPred::Ugt => a > b,
        CmpPred::Uge => a >= b,
    }
}
