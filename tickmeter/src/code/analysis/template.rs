use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    code::core::{Instruction, LocalVar, MethodBody, Opcode, Operand, OperandRule, TypeRef},
    error::{PatchError, Result},
};

/// One position of an instantiated template.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TemplateStep {
    pub opcode: Opcode,
    pub rule: OperandRule,
}

impl TemplateStep {
    pub fn new(opcode: Opcode, rule: OperandRule) -> Self {
        TemplateStep { opcode, rule }
    }

    pub fn matches(&self, ix: &Instruction) -> bool {
        ix.opcode == self.opcode && self.rule.matches(&ix.operand)
    }
}

impl fmt::Display for TemplateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.opcode, self.rule)
    }
}

/// Non-empty instruction sequence the matcher searches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    steps: Vec<TemplateStep>,
}

impl Template {
    pub fn new(steps: Vec<TemplateStep>) -> Result<Self> {
        if steps.is_empty() {
            return Err(PatchError::EmptyTemplate);
        }
        Ok(Template { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[TemplateStep] {
        &self.steps
    }

    pub fn first(&self) -> &TemplateStep {
        &self.steps[0]
    }
}

/// Operand requirement before it is bound to a concrete method body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandPattern {
    Any,
    Exact(Operand),
    /// Bound to the first local of this type declared by the body.
    LocalOfType(TypeRef),
    LocalSlot(LocalVar),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatternStep {
    pub opcode: Opcode,
    pub operand: OperandPattern,
}

impl PatternStep {
    pub fn new(opcode: Opcode, operand: OperandPattern) -> Self {
        PatternStep { opcode, operand }
    }
}

/// Template whose local-slot operands are resolved per method body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SequencePattern {
    pub steps: Vec<PatternStep>,
}

impl SequencePattern {
    pub fn new(steps: Vec<PatternStep>) -> Self {
        SequencePattern { steps }
    }

    /// Bind the pattern to `body`.
    ///
    /// Each `LocalOfType` is looked up once here and the resulting slot is
    /// reused for every match in the body.
    pub fn instantiate(&self, body: &MethodBody) -> Result<Template> {
        let steps = self
            .steps
            .iter()
            .map(|step| -> Result<TemplateStep> {
                let rule = match &step.operand {
                    OperandPattern::Any => OperandRule::Any,
                    OperandPattern::Exact(operand) => OperandRule::Exact(operand.clone()),
                    OperandPattern::LocalSlot(local) => OperandRule::LocalSlot(local.clone()),
                    OperandPattern::LocalOfType(local_type) => {
                        let local = body.local_of_type(local_type).ok_or_else(|| {
                            PatchError::MissingLocal {
                                method: body.method.clone(),
                                local_type: local_type.clone(),
                            }
                        })?;
                        OperandRule::LocalSlot(local.clone())
                    }
                };
                Ok(TemplateStep::new(step.opcode, rule))
            })
            .collect::<Result<Vec<_>>>()?;

        Template::new(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::core::{FieldRef, MethodRef};

    fn pattern() -> SequencePattern {
        SequencePattern::new(vec![
            PatternStep::new(
                Opcode::LdlocS,
                OperandPattern::LocalOfType(TypeRef::new("InvokeAction")),
            ),
            PatternStep::new(
                Opcode::Ldfld,
                OperandPattern::Exact(Operand::Field(FieldRef::new("InvokeAction", "action"))),
            ),
        ])
    }

    #[test]
    fn instantiation_binds_local_by_type() {
        let body = MethodBody::new(
            MethodRef::new("InvokeHandlerBase", "DoTick"),
            vec![],
            vec![LocalVar::new("Int32", 0), LocalVar::new("InvokeAction", 2)],
        );

        let template = pattern().instantiate(&body).unwrap();
        assert_eq!(template.len(), 2);
        assert_eq!(
            template.first().rule,
            OperandRule::LocalSlot(LocalVar::new("InvokeAction", 2))
        );
    }

    #[test]
    fn instantiation_fails_without_local() {
        let body = MethodBody::new(
            MethodRef::new("InvokeHandlerBase", "DoTick"),
            vec![],
            vec![LocalVar::new("Int32", 0)],
        );

        let err = pattern().instantiate(&body).unwrap_err();
        assert!(matches!(err, PatchError::MissingLocal { .. }));
    }

    #[test]
    fn empty_template_is_rejected() {
        assert!(matches!(Template::new(vec![]), Err(PatchError::EmptyTemplate)));
    }
}
