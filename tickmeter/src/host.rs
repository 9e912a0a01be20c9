//! Boundary to the process whose methods are patched
//!
//! The host hands out method bodies and takes rewritten ones back. How it
//! reads and installs them is its own business.

use std::collections::BTreeMap;

use crate::{
    code::core::{MethodBody, MethodRef},
    error::HostError,
};

pub trait MethodHost {
    /// Fresh copy of the current instruction stream of `method`.
    fn method_body(&self, method: &MethodRef) -> Result<MethodBody, HostError>;

    /// Replace the live behaviour of `body.method`.
    fn install_body(&mut self, body: MethodBody) -> Result<(), HostError>;
}

/// Host backed by a map of method bodies, used by the CLI and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryHost {
    bodies: BTreeMap<MethodRef, MethodBody>,
    installs: usize,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body: MethodBody) {
        self.bodies.insert(body.method.clone(), body);
    }

    pub fn get(&self, method: &MethodRef) -> Option<&MethodBody> {
        self.bodies.get(method)
    }

    pub fn install_count(&self) -> usize {
        self.installs
    }
}

impl MethodHost for InMemoryHost {
    fn method_body(&self, method: &MethodRef) -> Result<MethodBody, HostError> {
        self.bodies
            .get(method)
            .cloned()
            .ok_or_else(|| HostError::UnknownMethod(method.clone()))
    }

    fn install_body(&mut self, body: MethodBody) -> Result<(), HostError> {
        let Some(slot) = self.bodies.get_mut(&body.method) else {
            return Err(HostError::UnknownMethod(body.method));
        };
        *slot = body;
        self.installs += 1;
        Ok(())
    }
}
