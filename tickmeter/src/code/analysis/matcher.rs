use tracing::trace;

use crate::{
    code::{analysis::template::Template, core::Instruction},
    error::{PatchError, Result},
};

/// Find the first offset at or after `from_offset` where `template` matches.
///
/// Every position compares the opcode and then the operand rule. A candidate
/// is dropped on its first mismatching position. The scan stops as soon as
/// fewer instructions remain than the template is long.
pub fn find_next(
    instructions: &[Instruction],
    template: &Template,
    from_offset: usize,
) -> Result<Option<usize>> {
    if instructions.is_empty() {
        return Err(PatchError::EmptyBody);
    }

    let first = template.first();
    let mut idx = from_offset;
    while idx < instructions.len() && instructions.len() - idx >= template.len() {
        let ix = &instructions[idx];
        if ix.opcode != first.opcode {
            idx += 1;
            continue;
        }

        trace!(
            "Trying to match starting sequence {}, {} <-> {}, ({}){} <-> {}",
            idx,
            ix.opcode,
            first.opcode,
            ix.operand.kind(),
            ix.operand,
            first.rule
        );

        if !first.rule.matches(&ix.operand) {
            idx += 1;
            continue;
        }

        let mismatch = template
            .steps()
            .iter()
            .enumerate()
            .skip(1)
            .find(|(z, step)| !step.matches(&instructions[idx + z]));

        match mismatch {
            None => return Ok(Some(idx)),
            Some((z, step)) => {
                let current = &instructions[idx + z];
                trace!(
                    "Failed match {}, {} <-> {}, ({}){} <-> {}",
                    z,
                    current.opcode,
                    step.opcode,
                    current.operand.kind(),
                    current.operand,
                    step.rule
                );
            }
        }

        idx += 1;
    }

    Ok(None)
}

/// Start offsets of every non-overlapping occurrence, left to right.
pub fn find_all(instructions: &[Instruction], template: &Template) -> Result<Vec<usize>> {
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(idx) = find_next(instructions, template, from)? {
        found.push(idx);
        from = idx + template.len();
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{
        analysis::template::TemplateStep,
        core::{FieldRef, Label, LocalVar, MethodRef, Opcode, Operand, OperandRule},
    };

    fn template(slot: u16) -> Template {
        Template::new(vec![
            TemplateStep::new(
                Opcode::LdlocS,
                OperandRule::LocalSlot(LocalVar::new("InvokeAction", slot)),
            ),
            TemplateStep::new(
                Opcode::Ldfld,
                OperandRule::Exact(Operand::Field(FieldRef::new("InvokeAction", "action"))),
            ),
            TemplateStep::new(
                Opcode::Callvirt,
                OperandRule::Exact(Operand::Method(MethodRef::new("Action", "Invoke"))),
            ),
        ])
        .unwrap()
    }

    fn occurrence(slot: u16) -> Vec<Instruction> {
        vec![
            Instruction::load_local(LocalVar::new("InvokeAction", slot)),
            Instruction::load_field(FieldRef::new("InvokeAction", "action")),
            Instruction::call_virtual(MethodRef::new("Action", "Invoke")),
        ]
    }

    #[test]
    fn finds_occurrence_in_the_middle() {
        let mut body = vec![Instruction::new(Opcode::Nop); 4];
        body.extend(occurrence(2));
        body.push(Instruction::new(Opcode::Ret));

        assert_eq!(find_next(&body, &template(2), 0).unwrap(), Some(4));
        assert_eq!(find_next(&body, &template(2), 5).unwrap(), None);
    }

    #[test]
    fn slot_index_distinguishes_locals_of_same_type() {
        let body = occurrence(3);
        assert_eq!(find_next(&body, &template(2), 0).unwrap(), None);
        assert_eq!(find_next(&body, &template(3), 0).unwrap(), Some(0));
    }

    #[test]
    fn labels_do_not_affect_matching() {
        let mut body = occurrence(2);
        body[2].labels.push(Label(1));
        assert_eq!(find_next(&body, &template(2), 0).unwrap(), Some(0));
    }

    #[test]
    fn partial_match_at_the_tail_is_ignored() {
        let mut body = vec![Instruction::new(Opcode::Nop)];
        body.extend(occurrence(2).into_iter().take(2));
        assert_eq!(find_next(&body, &template(2), 0).unwrap(), None);
    }

    #[test]
    fn mismatch_in_later_position_keeps_scanning() {
        let mut body = occurrence(2);
        body[2] = Instruction::call_virtual(MethodRef::new("Action", "BeginInvoke"));
        body.extend(occurrence(2));
        assert_eq!(find_next(&body, &template(2), 0).unwrap(), Some(3));
    }

    #[test]
    fn offset_past_the_end_finds_nothing() {
        let body = occurrence(2);
        assert_eq!(find_next(&body, &template(2), 10).unwrap(), None);
    }

    #[test]
    fn empty_body_is_rejected() {
        assert!(matches!(
            find_next(&[], &template(2), 0),
            Err(PatchError::EmptyBody)
        ));
    }

    #[test]
    fn find_all_reports_every_occurrence() {
        let mut body = occurrence(2);
        body.push(Instruction::new(Opcode::Pop));
        body.extend(occurrence(2));
        body.extend(occurrence(2));
        assert_eq!(find_all(&body, &template(2)).unwrap(), vec![0, 4, 7]);
    }
}
