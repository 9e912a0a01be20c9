use thiserror::Error;

use crate::code::core::{MethodRef, TypeRef};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Unknown method: {0}")]
    UnknownMethod(MethodRef),
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("Method body is empty")]
    EmptyBody,
    #[error("Template is empty")]
    EmptyTemplate,
    #[error("Template could not be instantiated: no local of type {local_type} in {method}")]
    MissingLocal {
        method: MethodRef,
        local_type: TypeRef,
    },
    #[error("Invalid splice: {0}")]
    InvalidSplice(String),
    #[error("Rewrite did not converge after {splices} splices on {len} instructions")]
    RewriteDiverged { splices: usize, len: usize },
    #[error("Rewrite panicked: {0}")]
    Panicked(String),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PatchError>;
