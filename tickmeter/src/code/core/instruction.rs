//! Typed instruction representation
//!
//! An instruction is an opcode, one operand and the set of labels that mark
//! it as a jump target. Labels travel with the instruction they are attached
//! to and must be carried over when that instruction is spliced out.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::opcode::Opcode;

/// Name of a host type, e.g. `InvokeAction`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TypeRef(pub String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        TypeRef(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a method declared on a host type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct MethodRef {
    pub declaring_type: TypeRef,
    pub name: String,
}

impl MethodRef {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        MethodRef {
            declaring_type: TypeRef::new(declaring_type),
            name: name.into(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// Reference to a field declared on a host type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct FieldRef {
    pub declaring_type: TypeRef,
    pub name: String,
}

impl FieldRef {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        FieldRef {
            declaring_type: TypeRef::new(declaring_type),
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// Declared local variable slot of a method body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct LocalVar {
    pub local_type: TypeRef,
    pub index: u16,
}

impl LocalVar {
    pub fn new(local_type: impl Into<String>, index: u16) -> Self {
        LocalVar {
            local_type: TypeRef::new(local_type),
            index,
        }
    }
}

impl fmt::Display for LocalVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V_{} ({})", self.index, self.local_type)
    }
}

/// Opaque jump-target marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label_{}", self.0)
    }
}

/// Operand values the rewriter never looks inside.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Target(Label),
    Type(TypeRef),
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => a == b,
            // Bitwise so that a NaN constant still equals itself
            (Literal::Float(a), Literal::Float(b)) => a.to_bits() == b.to_bits(),
            (Literal::Str(a), Literal::Str(b)) => a == b,
            (Literal::Target(a), Literal::Target(b)) => a == b,
            (Literal::Type(a), Literal::Type(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::Str(v) => write!(f, "{:?}", v),
            Literal::Target(label) => write!(f, "{}", label),
            Literal::Type(ty) => write!(f, "{}", ty),
        }
    }
}

/// Argument attached to an opcode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    #[default]
    None,
    Method(MethodRef),
    Field(FieldRef),
    Local(LocalVar),
    Other(Literal),
}

impl Operand {
    pub fn is_none(&self) -> bool {
        matches!(self, Operand::None)
    }

    /// Short name of the operand kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Operand::None => "none",
            Operand::Method(_) => "method",
            Operand::Field(_) => "field",
            Operand::Local(_) => "local",
            Operand::Other(_) => "other",
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Method(method) => write!(f, "{}", method),
            Operand::Field(field) => write!(f, "{}", field),
            Operand::Local(local) => write!(f, "{}", local),
            Operand::Other(literal) => write!(f, "{}", literal),
        }
    }
}

pub type Labels = SmallVec<[Label; 2]>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Instruction {
    pub opcode: Opcode,
    #[serde(default, skip_serializing_if = "Operand::is_none")]
    pub operand: Operand,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

impl Instruction {
    /// Create an instruction with no operand
    pub fn new(opcode: Opcode) -> Self {
        Instruction {
            opcode,
            operand: Operand::None,
            labels: Labels::new(),
        }
    }

    pub fn with_operand(opcode: Opcode, operand: Operand) -> Self {
        Instruction {
            opcode,
            operand,
            labels: Labels::new(),
        }
    }

    pub fn labeled(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn load_local(local: LocalVar) -> Self {
        Instruction::with_operand(Opcode::LdlocS, Operand::Local(local))
    }

    pub fn load_field(field: FieldRef) -> Self {
        Instruction::with_operand(Opcode::Ldfld, Operand::Field(field))
    }

    pub fn call(method: MethodRef) -> Self {
        Instruction::with_operand(Opcode::Call, Operand::Method(method))
    }

    pub fn call_virtual(method: MethodRef) -> Self {
        Instruction::with_operand(Opcode::Callvirt, Operand::Method(method))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if !self.operand.is_none() {
            write!(f, " {}", self.operand)?;
        }
        if !self.labels.is_empty() {
            let labels = self
                .labels
                .iter()
                .map(|label| label.to_string())
                .collect::<Vec<_>>();
            write!(f, " [{}]", labels.join(", "))?;
        }
        Ok(())
    }
}
