// Property tests for the matcher and rewriter over generated method bodies

use proptest::prelude::*;
use tickmeter::{
    code::{FieldRef, Instruction, Label, Literal, LocalVar, MethodBody, MethodRef, Operand},
    find_next, rewrite_all, Opcode, PatchConfig, SpliceRule, Template,
};

fn config() -> PatchConfig {
    PatchConfig::default()
}

fn occurrence() -> Vec<Instruction> {
    let config = config();
    vec![
        Instruction::load_local(LocalVar::new("InvokeAction", 2)),
        Instruction::load_field(config.field),
        Instruction::call_virtual(config.invoke),
    ]
}

/// Instructions that never start an occurrence on their own.
fn filler() -> impl Strategy<Value = Instruction> {
    prop_oneof![
        Just(Instruction::new(Opcode::Nop)),
        Just(Instruction::new(Opcode::Pop)),
        Just(Instruction::new(Opcode::Ret)),
        any::<i32>().prop_map(|v| {
            Instruction::with_operand(Opcode::LdcI4, Operand::Other(Literal::Int(v as i64)))
        }),
        Just(Instruction::load_local(LocalVar::new("InvokeAction", 3))),
        Just(Instruction::load_field(FieldRef::new("InvokeAction", "action"))),
        Just(Instruction::call_virtual(MethodRef::new("Action", "Invoke"))),
    ]
}

/// A body with a known number of occurrences and uniquely labelled
/// instructions scattered across it.
fn body_with_occurrences(max: usize) -> impl Strategy<Value = (MethodBody, usize)> {
    (
        prop::collection::vec(filler(), 1..40),
        prop::collection::vec(any::<prop::sample::Index>(), 0..=max),
        prop::collection::vec(any::<bool>(), 80),
    )
        .prop_map(|(mut instructions, slots, label_mask)| {
            let mut positions = slots
                .iter()
                .map(|slot| slot.index(instructions.len() + 1))
                .collect::<Vec<_>>();
            positions.sort_unstable();
            for pos in positions.iter().rev() {
                instructions.splice(*pos..*pos, occurrence());
            }

            let mut next_label = 0;
            for (ix, labeled) in instructions.iter_mut().zip(label_mask) {
                if labeled {
                    ix.labels.push(Label(next_label));
                    next_label += 1;
                }
            }

            let body = MethodBody::new(
                config().target,
                instructions,
                vec![LocalVar::new("InvokeAction", 2), LocalVar::new("InvokeAction", 3)],
            );
            (body, positions.len())
        })
}

fn template_for(body: &MethodBody) -> Template {
    config().pattern().instantiate(body).unwrap()
}

fn rule() -> SpliceRule {
    config().splice_rule().unwrap()
}

proptest! {
    #[test]
    fn every_occurrence_is_rewritten((body, n) in body_with_occurrences(5)) {
        let template = template_for(&body);
        let mut rewritten = body.clone();

        let count = rewrite_all(&mut rewritten, &template, &rule()).unwrap();

        prop_assert_eq!(count, n);
        prop_assert_eq!(rewritten.len(), body.len() - 2 * n);
        prop_assert_eq!(find_next(&rewritten.instructions, &template, 0).unwrap(), None);
    }
}

proptest! {
    #[test]
    fn labels_survive_in_order((body, _n) in body_with_occurrences(5)) {
        let template = template_for(&body);
        let mut rewritten = body.clone();

        rewrite_all(&mut rewritten, &template, &rule()).unwrap();

        let before = body.labels().collect::<Vec<_>>();
        let after = rewritten.labels().collect::<Vec<_>>();
        prop_assert_eq!(before, after);
    }
}

proptest! {
    #[test]
    fn second_pass_finds_nothing((body, _n) in body_with_occurrences(5)) {
        let template = template_for(&body);
        let mut rewritten = body.clone();
        rewrite_all(&mut rewritten, &template, &rule()).unwrap();
        let once = rewritten.clone();

        prop_assert_eq!(rewrite_all(&mut rewritten, &template, &rule()).unwrap(), 0);
        prop_assert_eq!(rewritten, once);
    }
}

proptest! {
    #[test]
    fn bodies_without_occurrences_are_untouched((body, _n) in body_with_occurrences(0)) {
        let template = template_for(&body);
        let mut rewritten = body.clone();

        prop_assert_eq!(rewrite_all(&mut rewritten, &template, &rule()).unwrap(), 0);
        prop_assert_eq!(rewritten, body);
    }
}
