//! Instruction model: the nodes that populate a compiled program graph.
//!
//! A compiled [`Program`] is a flat list of [`Instruction`]s connected by
//! success/failure edges that are plain indices into the same list. The VM
//! interprets these with a `loop { match kind { ... } }` dispatch; visitors
//! walk the same edges without executing anything.
//!
//! [`Program`]: crate::Program

use std::fmt;
use std::sync::Arc;

use crate::error::BodyError;
use crate::visitor::ProgramVisitor;

/// Body of a rule: consumes the payload, returns the transformed payload.
pub type RuleBody<P> = dyn Fn(P) -> Result<P, BodyError> + Send + Sync;

/// Body of a branch: inspects the payload, returns the condition outcome.
pub type CondBody<P> = dyn Fn(&P) -> Result<bool, BodyError> + Send + Sync;

/// Body of a branch_rule: consumes the payload and either transforms it or
/// hands it back untouched.
pub type StepBody<P> = dyn Fn(P) -> Result<Progress<P>, BodyError> + Send + Sync;

/// Outcome of a branch_rule body.
///
/// Replaces the original's process-wide "no progress" sentinel with an
/// explicit variant: payload values may be anything, including ones a
/// value-level sentinel would be confused with, so the distinction lives in
/// the type. `NotDone` carries the payload back unchanged, which is what
/// makes the false edge side-effect free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress<P> {
    /// Progress was made; the wrapped value is the new payload.
    Done(P),
    /// No progress; the wrapped value is the payload, untouched.
    NotDone(P),
}

/// Which exit edge of an instruction is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edge {
    True,
    False,
}

/// The executable part of an instruction.
///
/// A tagged variant rather than a trait object: dispatch is a `match` in
/// both the VM and the visitor driver, and instructions stay packed in the
/// program's instruction list.
pub(crate) enum InstructionKind<P> {
    /// Transforms the payload; never touches the flag.
    Rule(Arc<RuleBody<P>>),
    /// Tests the payload; writes the flag and picks an edge.
    Branch(Arc<CondBody<P>>),
    /// Tries to transform the payload; takes the false edge on no progress.
    BranchRule(Arc<StepBody<P>>),
    /// Terminates, or continues at a patched-in continuation (sub-program
    /// returns). `Some(value)` overrides the flag, `None` carries it.
    Return(Option<bool>),
}

impl<P> InstructionKind<P> {
    fn tag(&self) -> &'static str {
        match self {
            InstructionKind::Rule(_) => "rule",
            InstructionKind::Branch(_) => "branch",
            InstructionKind::BranchRule(_) => "branch_rule",
            InstructionKind::Return(_) => "return",
        }
    }
}

/// One node of a compiled program graph.
///
/// `index` is both the identity of the instruction and its position in the
/// owning program's instruction list. Both edges are resolved to valid
/// indices before compilation completes; only returns may leave them `None`
/// (a return with edges is a sub-program return continuing at its caller).
pub struct Instruction<P> {
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) kind: InstructionKind<P>,
    pub(crate) next_on_true: Option<usize>,
    pub(crate) next_on_false: Option<usize>,
}

impl<P> Instruction<P> {
    pub(crate) fn new(index: usize, name: impl Into<String>, kind: InstructionKind<P>) -> Self {
        Self {
            index,
            name: name.into(),
            kind,
            next_on_true: None,
            next_on_false: None,
        }
    }

    /// The instruction's position in the program's instruction list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Human-readable name, shown by the visitors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The index followed on the given exit, if resolved.
    ///
    /// Visitors use this to walk edges without executing bodies.
    pub fn next(&self, on_true: bool) -> Option<usize> {
        if on_true {
            self.next_on_true
        } else {
            self.next_on_false
        }
    }

    /// Whether this is a return instruction.
    pub fn is_return(&self) -> bool {
        matches!(self.kind, InstructionKind::Return(_))
    }

    /// Whether this instruction has two distinct, meaningful exits.
    pub fn is_branching(&self) -> bool {
        matches!(
            self.kind,
            InstructionKind::Branch(_) | InstructionKind::BranchRule(_)
        )
    }

    /// The explicit return value, for returns that carry one.
    pub fn return_value(&self) -> Option<bool> {
        match self.kind {
            InstructionKind::Return(value) => value,
            _ => None,
        }
    }

    pub(crate) fn set_edge(&mut self, edge: Edge, target: usize) {
        match edge {
            Edge::True => self.next_on_true = Some(target),
            Edge::False => self.next_on_false = Some(target),
        }
    }

    /// Execute the instruction's body.
    ///
    /// Returns the next instruction to execute (`None` terminates), the
    /// updated flag, and the payload. A rule passes the flag through
    /// unchanged; a branch or branch_rule overwrites it with its outcome; a
    /// return substitutes its explicit value if it has one.
    pub(crate) fn run(
        &self,
        flag: bool,
        payload: P,
    ) -> Result<(Option<usize>, bool, P), BodyError> {
        match &self.kind {
            InstructionKind::Rule(body) => {
                let payload = body(payload)?;
                Ok((self.next_on_true, flag, payload))
            }
            InstructionKind::Branch(body) => {
                let outcome = body(&payload)?;
                Ok((self.next(outcome), outcome, payload))
            }
            InstructionKind::BranchRule(body) => match body(payload)? {
                Progress::Done(payload) => Ok((self.next_on_true, true, payload)),
                Progress::NotDone(payload) => Ok((self.next_on_false, false, payload)),
            },
            InstructionKind::Return(value) => {
                Ok((self.next_on_true, value.unwrap_or(flag), payload))
            }
        }
    }

    /// Dispatch to the matching visitor method.
    ///
    /// branch_rule is a branching instruction and visits as a branch.
    pub fn accept<V: ProgramVisitor<P> + ?Sized>(&self, visitor: &mut V) {
        match self.kind {
            InstructionKind::Rule(_) => visitor.visit_rule(self),
            InstructionKind::Branch(_) | InstructionKind::BranchRule(_) => {
                visitor.visit_branch(self)
            }
            InstructionKind::Return(_) => visitor.visit_return(self),
        }
    }
}

impl<P> fmt::Debug for Instruction<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("kind", &self.kind.tag())
            .field("next_on_true", &self.next_on_true)
            .field("next_on_false", &self.next_on_false)
            .finish()
    }
}
