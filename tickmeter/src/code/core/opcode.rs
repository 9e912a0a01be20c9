use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Operation tag of a single instruction.
///
/// The set covers the stack-machine instructions a host method body is
/// expected to contain around call sites. Tags compare by identity, the
/// textual form is the host's mnemonic.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Deserialize,
    Serialize,
)]
pub enum Opcode {
    #[strum(serialize = "nop")]
    #[serde(rename = "nop")]
    Nop,
    #[strum(serialize = "ldarg")]
    #[serde(rename = "ldarg")]
    Ldarg,
    #[strum(serialize = "ldarg.0")]
    #[serde(rename = "ldarg.0")]
    Ldarg0,
    #[strum(serialize = "ldloc")]
    #[serde(rename = "ldloc")]
    Ldloc,
    #[strum(serialize = "ldloc.s")]
    #[serde(rename = "ldloc.s")]
    LdlocS,
    #[strum(serialize = "stloc")]
    #[serde(rename = "stloc")]
    Stloc,
    #[strum(serialize = "stloc.s")]
    #[serde(rename = "stloc.s")]
    StlocS,
    #[strum(serialize = "ldfld")]
    #[serde(rename = "ldfld")]
    Ldfld,
    #[strum(serialize = "stfld")]
    #[serde(rename = "stfld")]
    Stfld,
    #[strum(serialize = "ldc.i4")]
    #[serde(rename = "ldc.i4")]
    LdcI4,
    #[strum(serialize = "ldc.r8")]
    #[serde(rename = "ldc.r8")]
    LdcR8,
    #[strum(serialize = "ldstr")]
    #[serde(rename = "ldstr")]
    Ldstr,
    #[strum(serialize = "ldnull")]
    #[serde(rename = "ldnull")]
    Ldnull,
    #[strum(serialize = "dup")]
    #[serde(rename = "dup")]
    Dup,
    #[strum(serialize = "pop")]
    #[serde(rename = "pop")]
    Pop,
    #[strum(serialize = "add")]
    #[serde(rename = "add")]
    Add,
    #[strum(serialize = "sub")]
    #[serde(rename = "sub")]
    Sub,
    #[strum(serialize = "clt")]
    #[serde(rename = "clt")]
    Clt,
    #[strum(serialize = "call")]
    #[serde(rename = "call")]
    Call,
    #[strum(serialize = "callvirt")]
    #[serde(rename = "callvirt")]
    Callvirt,
    #[strum(serialize = "newobj")]
    #[serde(rename = "newobj")]
    Newobj,
    #[strum(serialize = "br")]
    #[serde(rename = "br")]
    Br,
    #[strum(serialize = "brtrue")]
    #[serde(rename = "brtrue")]
    Brtrue,
    #[strum(serialize = "brfalse")]
    #[serde(rename = "brfalse")]
    Brfalse,
    #[strum(serialize = "leave")]
    #[serde(rename = "leave")]
    Leave,
    #[strum(serialize = "endfinally")]
    #[serde(rename = "endfinally")]
    Endfinally,
    #[strum(serialize = "ret")]
    #[serde(rename = "ret")]
    Ret,
}

impl Opcode {
    /// Whether the instruction transfers control to a method.
    pub fn is_call(self) -> bool {
        matches!(self, Opcode::Call | Opcode::Callvirt | Opcode::Newobj)
    }

    /// Whether the operand of this instruction is a jump target.
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Opcode::Br | Opcode::Brtrue | Opcode::Brfalse | Opcode::Leave
        )
    }

    pub fn mnemonic(self) -> &'static str {
        self.into()
    }
}
