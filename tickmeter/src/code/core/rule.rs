use std::fmt;

use serde::{Deserialize, Serialize};

use super::instruction::{Instruction, LocalVar, Operand};

/// How an instruction operand is compared against one template position.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandRule {
    /// Any operand, including none.
    Any,
    /// The operand must be this exact value.
    Exact(Operand),
    /// The operand must be a local of the same declared type and slot index.
    LocalSlot(LocalVar),
}

impl OperandRule {
    /// Compare an instruction operand against the rule.
    ///
    /// Local slots are compared structurally: two locals of the same type in
    /// different slots never match each other.
    pub fn matches(&self, operand: &Operand) -> bool {
        match self {
            OperandRule::Any => true,
            OperandRule::Exact(expected) => operand == expected,
            OperandRule::LocalSlot(expected) => match operand {
                Operand::Local(actual) => {
                    actual.local_type == expected.local_type && actual.index == expected.index
                }
                _ => false,
            },
        }
    }
}

impl fmt::Display for OperandRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandRule::Any => f.write_str("*"),
            OperandRule::Exact(operand) => write!(f, "{} {}", operand.kind(), operand),
            OperandRule::LocalSlot(local) => write!(f, "local {}", local),
        }
    }
}

/// Operand comparison for a single instruction.
pub fn matches(instr: &Instruction, rule: &OperandRule) -> bool {
    rule.matches(&instr.operand)
}
