use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    code::{
        analysis::{OperandPattern, PatternStep, SequencePattern},
        core::{FieldRef, MethodRef, Opcode, Operand, TypeRef},
        modification::SpliceRule,
    },
    error::Result,
};

/// What the invoke timing patch looks for and what it calls instead.
///
/// The defaults target the host's invoke handler tick loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PatchConfig {
    pub name: String,
    pub target: MethodRef,
    /// Type of the local holding the scheduled invocation
    pub local_type: TypeRef,
    pub load_opcode: Opcode,
    pub field: FieldRef,
    pub invoke: MethodRef,
    pub wrapper: MethodRef,
    /// Wait for the readiness gate before patching
    pub delayed: bool,
}

impl Default for PatchConfig {
    fn default() -> Self {
        PatchConfig {
            name: "InvokeHandlerBase_DoTick_Patch".into(),
            target: MethodRef::new("InvokeHandlerBase<InvokeHandler>", "DoTick"),
            local_type: TypeRef::new("InvokeAction"),
            load_opcode: Opcode::LdlocS,
            field: FieldRef::new("InvokeAction", "action"),
            invoke: MethodRef::new("Action", "Invoke"),
            wrapper: MethodRef::new("InvokeHandlerBase_DoTick_Patch", "InvokeWrapper"),
            delayed: true,
        }
    }
}

impl PatchConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&text)?)
    }

    /// `load local; ldfld action; callvirt Invoke`
    pub fn pattern(&self) -> SequencePattern {
        SequencePattern::new(vec![
            PatternStep::new(
                self.load_opcode,
                OperandPattern::LocalOfType(self.local_type.clone()),
            ),
            PatternStep::new(
                Opcode::Ldfld,
                OperandPattern::Exact(Operand::Field(self.field.clone())),
            ),
            PatternStep::new(
                Opcode::Callvirt,
                OperandPattern::Exact(Operand::Method(self.invoke.clone())),
            ),
        ])
    }

    /// Keep the local load, turn the field load into the wrapper call and
    /// drop the virtual invoke.
    pub fn splice_rule(&self) -> Result<SpliceRule> {
        SpliceRule::collapse_tail(
            1,
            self.pattern().steps.len(),
            Opcode::Call,
            Operand::Method(self.wrapper.clone()),
        )
    }
}
