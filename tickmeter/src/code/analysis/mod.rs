//! Template definition and sequence matching over flattened instruction lists

pub mod matcher;
pub mod template;

pub use matcher::{find_all, find_next};
pub use template::{
    OperandPattern, PatternStep, SequencePattern, Template, TemplateStep,
};
