//! Name-to-description registry.
//!
//! The batch runner refers to ops and whole programs by name: a job record
//! stores "which program" as a string. The host populates a [`Registry`] at
//! startup and the runner looks descriptions up when a job starts; there is
//! no reflective module resolution anywhere in the engine.

use std::collections::HashMap;

use crate::compiler::Op;

/// Registered ops and program descriptions, keyed by name.
///
/// Registering under an existing name replaces the previous entry; lookups
/// return `None` on a miss and the caller decides how hard that is.
/// Descriptions clone cheaply (bodies live behind `Arc`), so handing out
/// owned copies keeps the registry usable while compiled programs are
/// running elsewhere.
pub struct Registry<P> {
    ops: HashMap<String, Op<P>>,
    programs: HashMap<String, Vec<Op<P>>>,
}

impl<P> Registry<P> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            ops: HashMap::new(),
            programs: HashMap::new(),
        }
    }

    /// Register a single op under `name`.
    pub fn register_op(&mut self, name: impl Into<String>, op: Op<P>) {
        self.ops.insert(name.into(), op);
    }

    /// Look up an op by name.
    pub fn op(&self, name: &str) -> Option<Op<P>> {
        self.ops.get(name).cloned()
    }

    /// Register a whole program description under `name`.
    pub fn register_program(&mut self, name: impl Into<String>, description: Vec<Op<P>>) {
        self.programs.insert(name.into(), description);
    }

    /// Look up a program description by name.
    pub fn program(&self, name: &str) -> Option<Vec<Op<P>>> {
        self.programs.get(name).cloned()
    }

    /// Names of all registered programs, in no particular order.
    pub fn program_names(&self) -> impl Iterator<Item = &str> {
        self.programs.keys().map(String::as_str)
    }
}

impl<P> Default for Registry<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;

    #[test]
    fn test_lookup_and_replace() {
        let mut registry: Registry<i64> = Registry::new();
        registry.register_op("double", Op::rule("double", |n: i64| Ok(n * 2)));
        assert!(registry.op("double").is_some());
        assert!(registry.op("missing").is_none());

        registry.register_op("double", Op::rule("double", |n: i64| Ok(n + n)));
        assert!(registry.op("double").is_some());
    }

    #[test]
    fn test_program_compiles_from_registry() {
        let mut registry: Registry<i64> = Registry::new();
        registry.register_program(
            "increment",
            vec![Op::rule("increment", |n: i64| Ok(n + 1)), Op::Return(None)],
        );

        let description = registry.program("increment").unwrap();
        let program = compile(description).unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(registry.program_names().collect::<Vec<_>>(), ["increment"]);
    }
}
