//! Renders a module back to its text form.
//!
//! Output parses back to a structurally identical module, so the passes can
//! be chained through files and pipes without loss.

use std::fmt::Write;

use crate::inst::{BlockId, Term};
use crate::module::{Function, Linkage, Module};

pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    for g in &module.globals {
        match g.init {
            Some(v) => {
                let _ = writeln!(out, "global {}: {} = {}", g.name, g.ty, v);
            }
            None => {
                let _ = writeln!(out, "global {}: {}", g.name, g.ty);
            }
        }
    }
    for (i, f) in module.functions.iter().enumerate() {
        if i > 0 || !module.globals.is_empty() {
            out.push('\n');
        }
        write_function(&mut out, f);
    }
    out
}

pub fn print_function(f: &Function) -> String {
    let mut out = String::new();
    write_function(&mut out, f);
    out
}

fn write_function(out: &mut String, f: &Function) {
    if f.is_declaration() {
        let _ = writeln!(out, "declare {}({})", f.name, params(f.params));
        return;
    }
    let mut head = String::from("fn ");
    if f.linkage == Linkage::Internal {
        head.push_str("internal ");
    }
    if f.optnone {
        head.push_str("optnone ");
    }
    let _ = writeln!(out, "{head}{}({}) {{", f.name, params(f.params));
    for block in &f.blocks {
        let _ = writeln!(out, "{}:", block.label);
        for inst in &block.insts {
            let _ = writeln!(out, "  {inst}");
        }
        match &block.term {
            Term::Jmp(to) => {
                let _ = writeln!(out, "  jmp {}", label(f, *to));
            }
            Term::Br { cond, then_to, else_to } => {
                let _ = writeln!(out, "  br {cond}, {}, {}", label(f, *then_to), label(f, *else_to));
            }
            Term::Ret(None) => {
                let _ = writeln!(out, "  ret");
            }
            Term::Ret(Some(v)) => {
                let _ = writeln!(out, "  ret {v}");
            }
        }
    }
    out.push_str("}\n");
}

fn label(f: &Function, id: BlockId) -> String {
    match f.blocks.get(id.index()) {
        Some(b) => b.label.clone(),
        None => id.to_string(),
    }
}

fn params(count: u32) -> String {
    let mut out = String::new();
    for i in 0..count {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "%{i}");
    }
    out
}
