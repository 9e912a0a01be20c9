//! Instruction-stream toolkit
//!
//! - `core`: opcodes, operands, labels, method bodies and operand rules
//! - `analysis`: templates and the sequence matcher
//! - `modification`: splice rules and the stream rewriter
//! - `utils`: listing helpers for logs and the CLI

pub mod analysis;
pub mod core;
pub mod modification;
pub mod utils;

pub use analysis::{
    find_all, find_next, OperandPattern, PatternStep, SequencePattern, Template, TemplateStep,
};
pub use self::core::{
    FieldRef, Instruction, Label, Literal, LocalVar, MethodBody, MethodRef, Opcode, Operand,
    OperandRule, TypeRef,
};
pub use modification::{rewrite_all, SpliceRule};
pub use utils::{debug_print_body, format_listing};
