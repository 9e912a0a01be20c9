use colored::Colorize;
use tracing::debug;

use crate::code::core::{Instruction, MethodBody};

/// One listing line, `IL_0004: ldloc.s V_2 (InvokeAction)`.
pub fn format_instruction(offset: usize, ix: &Instruction) -> String {
    let opcode = if ix.opcode.is_call() {
        ix.opcode.mnemonic().yellow()
    } else if ix.opcode.is_branch() {
        ix.opcode.mnemonic().cyan()
    } else {
        ix.opcode.mnemonic().normal()
    };

    let mut line = format!("IL_{:04}: {}", offset, opcode);
    if !ix.operand.is_none() {
        line.push(' ');
        line.push_str(&ix.operand.to_string());
    }
    if !ix.labels.is_empty() {
        let labels = ix
            .labels
            .iter()
            .map(|label| label.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        line.push_str(&format!(" [{}]", labels.magenta()));
    }
    line
}

pub fn format_listing(body: &MethodBody) -> String {
    let mut out = format!("{} ({} instructions)\n", body.method.to_string().bold(), body.len());
    for local in &body.locals {
        out.push_str(&format!("  .local {}\n", local));
    }
    for (offset, ix) in body.instructions.iter().enumerate() {
        out.push_str("  ");
        out.push_str(&format_instruction(offset, ix));
        out.push('\n');
    }
    out
}

pub fn debug_print_body(body: &MethodBody) {
    for (offset, ix) in body.instructions.iter().enumerate() {
        debug!("{}: {}", body.method, format_instruction(offset, ix));
    }
}
