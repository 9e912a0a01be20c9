use serde::{Deserialize, Serialize};

use super::instruction::{Instruction, Label, LocalVar, MethodRef, TypeRef};

/// Instruction stream and declared locals of one host method.
///
/// A body is fetched fresh from the host for every patch application and
/// handed back afterwards; nothing keeps it across applications.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MethodBody {
    pub method: MethodRef,
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub locals: Vec<LocalVar>,
}

impl MethodBody {
    pub fn new(method: MethodRef, instructions: Vec<Instruction>, locals: Vec<LocalVar>) -> Self {
        MethodBody {
            method,
            instructions,
            locals,
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// First declared local of the given type.
    pub fn local_of_type(&self, local_type: &TypeRef) -> Option<&LocalVar> {
        self.locals
            .iter()
            .find(|local| &local.local_type == local_type)
    }

    /// Every label in the stream, in instruction order.
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.instructions
            .iter()
            .flat_map(|ix| ix.labels.iter().copied())
    }
}
