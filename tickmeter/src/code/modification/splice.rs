use serde::{Deserialize, Serialize};

use crate::{
    code::core::{Instruction, Opcode, Operand},
    error::{PatchError, Result},
};

/// Replace-then-truncate edit applied at every template match.
///
/// The instruction at `match + replace_at` is overwritten by the replacement,
/// then the `remove_count` instructions right after it are removed. Labels of
/// the overwritten and removed instructions all end up on the replacement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SpliceRule {
    pub replace_at: usize,
    pub remove_count: usize,
    pub opcode: Opcode,
    #[serde(default)]
    pub operand: Operand,
}

impl SpliceRule {
    pub fn new(replace_at: usize, remove_count: usize, opcode: Opcode, operand: Operand) -> Self {
        SpliceRule {
            replace_at,
            remove_count,
            opcode,
            operand,
        }
    }

    /// Keep everything before `replace_at`, collapse the rest of the
    /// template into the replacement.
    pub fn collapse_tail(
        replace_at: usize,
        template_len: usize,
        opcode: Opcode,
        operand: Operand,
    ) -> Result<Self> {
        let remove_count = template_len
            .checked_sub(replace_at + 1)
            .ok_or_else(|| {
                PatchError::InvalidSplice(format!(
                    "replace_at {} is outside a template of {} instructions",
                    replace_at, template_len
                ))
            })?;
        Ok(SpliceRule::new(replace_at, remove_count, opcode, operand))
    }

    pub fn validate(&self, template_len: usize) -> Result<()> {
        if self.replace_at + self.remove_count >= template_len {
            return Err(PatchError::InvalidSplice(format!(
                "replace_at {} + remove_count {} does not fit a template of {} instructions",
                self.replace_at, self.remove_count, template_len
            )));
        }
        Ok(())
    }

    /// Splice the match starting at `at`.
    ///
    /// The caller guarantees a full template match starts at `at`, so every
    /// touched position is in bounds.
    pub fn apply(&self, instructions: &mut Vec<Instruction>, at: usize) {
        let target = at + self.replace_at;

        let mut replacement = Instruction::with_operand(self.opcode, self.operand.clone());
        replacement
            .labels
            .extend(std::mem::take(&mut instructions[target].labels));

        for removed in instructions.drain(target + 1..=target + self.remove_count) {
            replacement.labels.extend(removed.labels);
        }

        instructions[target] = replacement;
    }
}
