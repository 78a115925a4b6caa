// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Parser for the module text format.
//!
//! Parsing happens in two phases, mirroring how branch targets work in the
//! format: the first phase walks the text line by line and builds functions
//! whose terminators still name their targets by label; the second phase
//! resolves every label to a [`BlockId`] once the owning function is
//! complete. Errors carry the 1-based line number they were discovered on.
//!
//! The grammar is line-oriented. `;` starts a comment, blank lines are
//! ignored, and every instruction, label, global, and function header lives
//! on its own line. See the crate docs for a worked example.

use std::collections::HashMap;

use thiserror::Error;

use crate::inst::{BinOp, BlockId, Callee, CmpPred, Inst, Operand, Reg, RmwOp, Term};
use crate::module::{Block, Function, Global, Linkage, Module};
use crate::types::Ty;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unknown instruction `{0}`")]
    UnknownMnemonic(String),
    #[error("malformed operand `{0}`")]
    BadOperand(String),
    #[error("malformed type `{0}`")]
    BadType(String),
    #[error("expected scalar type, found `{0}`")]
    NonScalarAccess(String),
    #[error("malformed label `{0}`")]
    BadLabel(String),
    #[error("duplicate label `{0}`")]
    DuplicateLabel(String),
    #[error("undefined label `{0}`")]
    UndefinedLabel(String),
    #[error("block `{0}` has no terminator")]
    MissingTerminator(String),
    #[error("instruction after terminator")]
    AfterTerminator,
    #[error("instruction outside a block")]
    OutsideBlock,
    #[error("`{0}` takes no result register")]
    UnexpectedResult(String),
    #[error("`{0}` needs a result register")]
    MissingResult(String),
    #[error("expected {expected} operands, found {found}")]
    OperandCount { expected: usize, found: usize },
    #[error("malformed call `{0}`")]
    BadCall(String),
    #[error("malformed function header `{0}`")]
    BadHeader(String),
    #[error("malformed parameter list `{0}`")]
    BadParams(String),
    #[error("malformed global `{0}`")]
    BadGlobal(String),
    #[error("only scalar globals take an initializer")]
    BadInit,
    #[error("duplicate global `{0}`")]
    DuplicateGlobal(String),
    #[error("duplicate function `{0}`")]
    DuplicateFunction(String),
    #[error("function `{0}` has no blocks")]
    EmptyBody(String),
    #[error("unexpected `{0}`")]
    Unexpected(String),
    #[error("unterminated function `{0}`")]
    UnterminatedFunction(String),
}

/// Parse a whole module from its text form.
pub fn parse_module(text: &str) -> Result<Module, ParseError> {
    Parser::default().run(text)
}

/// Terminator with branch targets still by label name.
enum PendingTerm {
    Jmp(String),
    Br { cond: Operand, then_to: String, else_to: String },
    Ret(Option<Operand>),
}

struct PendingBlock {
    label: String,
    insts: Vec<Inst>,
    term: Option<(PendingTerm, usize)>,
}

struct PendingFn {
    name: String,
    params: u32,
    linkage: Linkage,
    optnone: bool,
    blocks: Vec<PendingBlock>,
    labels: HashMap<String, u32>,
    max_reg: Option<u32>,
    header_line: usize,
}

#[derive(Default)]
struct Parser {
    module: Module,
    current: Option<PendingFn>,
}

impl Parser {
    fn run(mut self, text: &str) -> Result<Module, ParseError> {
        let mut last_line = 0;
        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            last_line = line;
            let stmt = match raw.find(';') {
                Some(pos) => raw[..pos].trim(),
                None => raw.trim(),
            };
            if stmt.is_empty() {
                continue;
            }
            if self.current.is_some() {
                self.body_statement(stmt, line)?;
            } else {
                self.top_statement(stmt, line)?;
            }
        }
        if let Some(f) = &self.current {
            return Err(err(last_line, ParseErrorKind::UnterminatedFunction(f.name.clone())));
        }
        Ok(self.module)
    }

    fn top_statement(&mut self, stmt: &str, line: usize) -> Result<(), ParseError> {
        if let Some(rest) = stmt.strip_prefix("global ") {
            return self.global(rest.trim(), line);
        }
        if let Some(rest) = stmt.strip_prefix("fn ") {
            return self.fn_header(rest.trim(), line);
        }
        if let Some(rest) = stmt.strip_prefix("declare ") {
            return self.declare(rest.trim(), line);
        }
        Err(err(line, ParseErrorKind::Unexpected(stmt.to_string())))
    }

    fn global(&mut self, rest: &str, line: usize) -> Result<(), ParseError> {
        let (name, spec) = rest
            .split_once(':')
            .ok_or_else(|| err(line, ParseErrorKind::BadGlobal(rest.to_string())))?;
        let name = ident(name, line, ParseErrorKind::BadGlobal)?;
        if self.module.global(&name).is_some() {
            return Err(err(line, ParseErrorKind::DuplicateGlobal(name)));
        }
        let (ty_str, init) = match spec.split_once('=') {
            Some((ty_str, init_str)) => {
                let init = init_str
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| err(line, ParseErrorKind::BadOperand(init_str.trim().into())))?;
                (ty_str, Some(init))
            }
            None => (spec, None),
        };
        let ty = parse_ty(ty_str, line)?;
        if init.is_some() && !ty.is_scalar() {
            return Err(err(line, ParseErrorKind::BadInit));
        }
        self.module.globals.push(Global { name, ty, init });
        Ok(())
    }

    fn fn_header(&mut self, rest: &str, line: usize) -> Result<(), ParseError> {
        let head = rest
            .strip_suffix('{')
            .ok_or_else(|| err(line, ParseErrorKind::BadHeader(rest.to_string())))?
            .trim();
        let (name, params, linkage, optnone) = signature(head, true, line)?;
        if self.module.function(&name).is_some() {
            return Err(err(line, ParseErrorKind::DuplicateFunction(name)));
        }
        self.current = Some(PendingFn {
            name,
            params,
            linkage,
            optnone,
            blocks: Vec::new(),
            labels: HashMap::new(),
            max_reg: params.checked_sub(1),
            header_line: line,
        });
        Ok(())
    }

    fn declare(&mut self, rest: &str, line: usize) -> Result<(), ParseError> {
        let (name, params, linkage, _) = signature(rest, false, line)?;
        if self.module.function(&name).is_some() {
            return Err(err(line, ParseErrorKind::DuplicateFunction(name)));
        }
        self.module.functions.push(Function {
            name,
            params,
            linkage,
            optnone: false,
            blocks: Vec::new(),
            next_reg: params,
        });
        Ok(())
    }

    fn body_statement(&mut self, stmt: &str, line: usize) -> Result<(), ParseError> {
        if stmt == "}" {
            let f = match self.current.take() {
                Some(f) => f,
                None => return Err(err(line, ParseErrorKind::Unexpected("}".into()))),
            };
            let resolved = resolve(f, line)?;
            self.module.functions.push(resolved);
            return Ok(());
        }
        let f = match self.current.as_mut() {
            Some(f) => f,
            None => return Err(err(line, ParseErrorKind::OutsideBlock)),
        };
        if let Some(label) = stmt.strip_suffix(':') {
            let label = ident(label, line, ParseErrorKind::BadLabel)?;
            if let Some(open) = f.blocks.last() {
                if open.term.is_none() {
                    return Err(err(line, ParseErrorKind::MissingTerminator(open.label.clone())));
                }
            }
            if f.labels.contains_key(&label) {
                return Err(err(line, ParseErrorKind::DuplicateLabel(label)));
            }
            f.labels.insert(label.clone(), f.blocks.len() as u32);
            f.blocks.push(PendingBlock { label, insts: Vec::new(), term: None });
            return Ok(());
        }
        let has_open_block = match f.blocks.last() {
            Some(b) => {
                if b.term.is_some() {
                    return Err(err(line, ParseErrorKind::AfterTerminator));
                }
                true
            }
            None => false,
        };
        if !has_open_block {
            return Err(err(line, ParseErrorKind::OutsideBlock));
        }
        let parsed = instruction(stmt, line, &mut f.max_reg)?;
        let block = match f.blocks.last_mut() {
            Some(b) => b,
            None => return Err(err(line, ParseErrorKind::OutsideBlock)),
        };
        match parsed {
            Parsed::Inst(inst) => block.insts.push(inst),
            Parsed::Term(term) => block.term = Some((term, line)),
        }
        Ok(())
    }
}

enum Parsed {
    Inst(Inst),
    Term(PendingTerm),
}

fn resolve(f: PendingFn, close_line: usize) -> Result<Function, ParseError> {
    if f.blocks.is_empty() {
        return Err(err(f.header_line, ParseErrorKind::EmptyBody(f.name)));
    }
    let lookup = |label: &str, line: usize| -> Result<BlockId, ParseError> {
        f.labels
            .get(label)
            .map(|&i| BlockId(i))
            .ok_or_else(|| err(line, ParseErrorKind::UndefinedLabel(label.to_string())))
    };
    let mut blocks = Vec::with_capacity(f.blocks.len());
    for block in &f.blocks {
        let (pending, line) = match &block.term {
            Some(t) => t,
            None => {
                return Err(err(
                    close_line,
                    ParseErrorKind::MissingTerminator(block.label.clone()),
                ))
            }
        };
        let term = match pending {
            PendingTerm::Jmp(label) => Term::Jmp(lookup(label, *line)?),
            PendingTerm::Br { cond, then_to, else_to } => Term::Br {
                cond: cond.clone(),
                then_to: lookup(then_to, *line)?,
                else_to: lookup(else_to, *line)?,
            },
            PendingTerm::Ret(v) => Term::Ret(v.clone()),
        };
        blocks.push(Block {
            label: block.label.clone(),
            insts: block.insts.clone(),
            term,
        });
    }
    Ok(Function {
        name: f.name,
        params: f.params,
        linkage: f.linkage,
        optnone: f.optnone,
        blocks,
        next_reg: f.max_reg.map_or(0, |m| m + 1),
    })
}

/// Parse `[internal] [optnone] name(%0, %1, ...)`.
fn signature(
    head: &str,
    allow_flags: bool,
    line: usize,
) -> Result<(String, u32, Linkage, bool), ParseError> {
    let (before, after) = head
        .split_once('(')
        .ok_or_else(|| err(line, ParseErrorKind::BadHeader(head.to_string())))?;
    let params_str = after
        .strip_suffix(')')
        .ok_or_else(|| err(line, ParseErrorKind::BadHeader(head.to_string())))?;

    let mut linkage = Linkage::External;
    let mut optnone = false;
    let mut name = None;
    for word in before.split_whitespace() {
        match word {
            "internal" if allow_flags && name.is_none() => linkage = Linkage::Internal,
            "optnone" if allow_flags && name.is_none() => optnone = true,
            _ if name.is_none() => {
                name = Some(ident(word, line, ParseErrorKind::BadHeader)?);
            }
            _ => return Err(err(line, ParseErrorKind::BadHeader(head.to_string()))),
        }
    }
    let name = name.ok_or_else(|| err(line, ParseErrorKind::BadHeader(head.to_string())))?;

    let mut params = 0u32;
    let params_str = params_str.trim();
    if !params_str.is_empty() {
        for tok in params_str.split(',') {
            match parse_reg(tok.trim(), line) {
                Ok(Reg(i)) if i == params => params += 1,
                _ => return Err(err(line, ParseErrorKind::BadParams(params_str.to_string()))),
            }
        }
    }
    Ok((name, params, linkage, optnone))
}

fn instruction(stmt: &str, line: usize, max_reg: &mut Option<u32>) -> Result<Parsed, ParseError> {
    // Peel off a result register: `%d = ...`.
    let (dst, rest) = match stmt.split_once('=') {
        Some((lhs, rhs)) if lhs.trim_start().starts_with('%') => {
            let reg = parse_reg(lhs.trim(), line)?;
            (Some(reg), rhs.trim())
        }
        _ => (None, stmt),
    };
    if let Some(reg) = dst {
        note_reg(max_reg, reg);
    }
    let (mnemonic, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let args = args.trim();

    let mut operand = |tok: &str| -> Result<Operand, ParseError> {
        let op = parse_operand(tok, line)?;
        if let Operand::Reg(r) = op {
            note_reg(max_reg, r);
        }
        Ok(op)
    };

    if let Some(op) = BinOp::from_mnemonic(mnemonic) {
        let dst = need_dst(dst, mnemonic, line)?;
        let [lhs, rhs] = fields::<2>(args, line)?;
        return Ok(Parsed::Inst(Inst::Bin {
            dst,
            op,
            lhs: operand(lhs)?,
            rhs: operand(rhs)?,
        }));
    }

    match mnemonic {
        "icmp" => {
            let dst = need_dst(dst, mnemonic, line)?;
            let (pred_str, rest) = args
                .split_once(char::is_whitespace)
                .ok_or_else(|| err(line, ParseErrorKind::BadOperand(args.to_string())))?;
            let pred = CmpPred::from_mnemonic(pred_str)
                .ok_or_else(|| err(line, ParseErrorKind::UnknownMnemonic(pred_str.to_string())))?;
            let [lhs, rhs] = fields::<2>(rest, line)?;
            Ok(Parsed::Inst(Inst::Cmp {
                dst,
                pred,
                lhs: operand(lhs)?,
                rhs: operand(rhs)?,
            }))
        }
        "load" => {
            let dst = need_dst(dst, mnemonic, line)?;
            let [ty_str, addr] = fields::<2>(args, line)?;
            Ok(Parsed::Inst(Inst::Load {
                dst,
                ty: parse_scalar_ty(ty_str, line)?,
                addr: operand(addr)?,
            }))
        }
        "store" => {
            no_dst(dst, mnemonic, line)?;
            let (ty_str, rest) = args
                .split_once(char::is_whitespace)
                .ok_or_else(|| err(line, ParseErrorKind::BadOperand(args.to_string())))?;
            let [value, addr] = fields::<2>(rest, line)?;
            Ok(Parsed::Inst(Inst::Store {
                ty: parse_scalar_ty(ty_str, line)?,
                value: operand(value)?,
                addr: operand(addr)?,
            }))
        }
        "atomicrmw" => {
            let dst = need_dst(dst, mnemonic, line)?;
            let (op_str, rest) = args
                .split_once(char::is_whitespace)
                .ok_or_else(|| err(line, ParseErrorKind::BadOperand(args.to_string())))?;
            let op = RmwOp::from_mnemonic(op_str)
                .ok_or_else(|| err(line, ParseErrorKind::UnknownMnemonic(op_str.to_string())))?;
            let (ty_str, rest) = rest
                .trim()
                .split_once(char::is_whitespace)
                .ok_or_else(|| err(line, ParseErrorKind::BadOperand(rest.to_string())))?;
            let [addr, value] = fields::<2>(rest, line)?;
            Ok(Parsed::Inst(Inst::AtomicRmw {
                dst,
                op,
                ty: parse_scalar_ty(ty_str, line)?,
                addr: operand(addr)?,
                value: operand(value)?,
            }))
        }
        "cmpxchg" => {
            let dst = need_dst(dst, mnemonic, line)?;
            let (ty_str, rest) = args
                .split_once(char::is_whitespace)
                .ok_or_else(|| err(line, ParseErrorKind::BadOperand(args.to_string())))?;
            let [addr, expected, new] = fields::<3>(rest, line)?;
            Ok(Parsed::Inst(Inst::CmpXchg {
                dst,
                ty: parse_scalar_ty(ty_str, line)?,
                addr: operand(addr)?,
                expected: operand(expected)?,
                new: operand(new)?,
            }))
        }
        "alloca" => {
            let dst = need_dst(dst, mnemonic, line)?;
            // Array types never contain a comma, so the first comma (if
            // any) separates the element type from the count.
            let (ty_str, count) = match args.split_once(',') {
                Some((ty_str, count_str)) => (ty_str, Some(operand(count_str.trim())?)),
                None => (args, None),
            };
            Ok(Parsed::Inst(Inst::Alloca {
                dst,
                ty: parse_ty(ty_str, line)?,
                count,
            }))
        }
        "call" => {
            let (callee_str, rest) = args
                .split_once('(')
                .ok_or_else(|| err(line, ParseErrorKind::BadCall(args.to_string())))?;
            let arg_list = rest
                .strip_suffix(')')
                .ok_or_else(|| err(line, ParseErrorKind::BadCall(args.to_string())))?;
            let callee = match operand(callee_str.trim())? {
                Operand::Sym(name) => Callee::Sym(name),
                Operand::Reg(r) => Callee::Reg(r),
                Operand::Imm(_) => {
                    return Err(err(line, ParseErrorKind::BadCall(args.to_string())))
                }
            };
            let mut call_args = Vec::new();
            let arg_list = arg_list.trim();
            if !arg_list.is_empty() {
                for tok in arg_list.split(',') {
                    call_args.push(operand(tok.trim())?);
                }
            }
            Ok(Parsed::Inst(Inst::Call { dst, callee, args: call_args }))
        }
        "jmp" => {
            no_dst(dst, mnemonic, line)?;
            let label = ident(args, line, ParseErrorKind::BadLabel)?;
            Ok(Parsed::Term(PendingTerm::Jmp(label)))
        }
        "br" => {
            no_dst(dst, mnemonic, line)?;
            let [cond, then_to, else_to] = fields::<3>(args, line)?;
            Ok(Parsed::Term(PendingTerm::Br {
                cond: operand(cond)?,
                then_to: ident(then_to, line, ParseErrorKind::BadLabel)?,
                else_to: ident(else_to, line, ParseErrorKind::BadLabel)?,
            }))
        }
        "ret" => {
            no_dst(dst, mnemonic, line)?;
            let value = if args.is_empty() { None } else { Some(operand(args)?) };
            Ok(Parsed::Term(PendingTerm::Ret(value)))
        }
        _ => Err(err(line, ParseErrorKind::UnknownMnemonic(mnemonic.to_string()))),
    }
}

/// Split `s` on commas into exactly `N` trimmed, non-empty fields.
fn fields<const N: usize>(s: &str, line: usize) -> Result<[&str; N], ParseError> {
    let mut out = [""; N];
    let mut count = 0;
    for tok in s.split(',') {
        if count == N {
            count += 1;
            break;
        }
        out[count] = tok.trim();
        count += 1;
    }
    if count != N || out.iter().any(|t| t.is_empty()) {
        return Err(err(line, ParseErrorKind::OperandCount { expected: N, found: count }));
    }
    Ok(out)
}

fn need_dst(dst: Option<Reg>, mnemonic: &str, line: usize) -> Result<Reg, ParseError> {
    dst.ok_or_else(|| err(line, ParseErrorKind::MissingResult(mnemonic.to_string())))
}

fn no_dst(dst: Option<Reg>, mnemonic: &str, line: usize) -> Result<(), ParseError> {
    match dst {
        Some(_) => Err(err(line, ParseErrorKind::UnexpectedResult(mnemonic.to_string()))),
        None => Ok(()),
    }
}

fn note_reg(max_reg: &mut Option<u32>, reg: Reg) {
    *max_reg = Some(max_reg.map_or(reg.0, |m| m.max(reg.0)));
}

fn parse_reg(tok: &str, line: usize) -> Result<Reg, ParseError> {
    tok.strip_prefix('%')
        .and_then(|n| n.parse::<u32>().ok())
        .map(Reg)
        .ok_or_else(|| err(line, ParseErrorKind::BadOperand(tok.to_string())))
}

fn parse_operand(tok: &str, line: usize) -> Result<Operand, ParseError> {
    if tok.starts_with('%') {
        return parse_reg(tok, line).map(Operand::Reg);
    }
    if let Some(name) = tok.strip_prefix('@') {
        return Ok(Operand::Sym(ident(name, line, |s| {
            ParseErrorKind::BadOperand(format!("@{s}"))
        })?));
    }
    tok.parse::<i64>()
        .map(Operand::Imm)
        .map_err(|_| err(line, ParseErrorKind::BadOperand(tok.to_string())))
}

fn parse_ty(s: &str, line: usize) -> Result<Ty, ParseError> {
    let s = s.trim();
    match s {
        "i8" => return Ok(Ty::I8),
        "i16" => return Ok(Ty::I16),
        "i32" => return Ok(Ty::I32),
        "i64" => return Ok(Ty::I64),
        "ptr" => return Ok(Ty::Ptr),
        _ => {}
    }
    // `[N x TY]`, possibly nested.
    let inner = s
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| err(line, ParseErrorKind::BadType(s.to_string())))?;
    let (len_str, elem_str) = inner
        .split_once(" x ")
        .ok_or_else(|| err(line, ParseErrorKind::BadType(s.to_string())))?;
    let len = len_str
        .trim()
        .parse::<u64>()
        .map_err(|_| err(line, ParseErrorKind::BadType(s.to_string())))?;
    let elem = parse_ty(elem_str, line)?;
    Ok(Ty::Array { elem: Box::new(elem), len })
}

fn parse_scalar_ty(s: &str, line: usize) -> Result<Ty, ParseError> {
    let ty = parse_ty(s, line)?;
    if !ty.is_scalar() {
        return Err(err(line, ParseErrorKind::NonScalarAccess(s.trim().to_string())));
    }
    Ok(ty)
}

fn ident(
    s: &str,
    line: usize,
    kind: impl FnOnce(String) -> ParseErrorKind,
) -> Result<String, ParseError> {
    let s = s.trim();
    let mut chars = s.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if head_ok && tail_ok {
        Ok(s.to_string())
    } else {
        Err(err(line, kind(s.to_string())))
    }
}

fn err(line: usize, kind: ParseErrorKind) -> ParseError {
    ParseError { line, kind }
}
