//! Instruction model
//!
//! Opcodes, operands, labels, the method body that holds them, and the
//! operand comparison rules the matcher is built on.

pub mod body;
pub mod instruction;
pub mod opcode;
pub mod rule;

pub use body::MethodBody;
pub use instruction::{
    FieldRef, Instruction, Label, Labels, Literal, LocalVar, MethodRef, Operand, TypeRef,
};
pub use opcode::Opcode;
pub use rule::{matches, OperandRule};
