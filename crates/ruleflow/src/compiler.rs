//! Rule-program compiler: translates a program description to an
//! instruction graph.
//!
//! A description is a flat sequence of [`Op`]s (rules, branches, structured
//! control-flow markers, returns, and sub-program definitions/calls),
//! usually assembled with a [`ProgramBuilder`]. The compiler walks the
//! sequence exactly once and emits an ordered instruction list in which
//! every success/failure edge is resolved to an instruction index.
//!
//! Edge targets use a pending-fixup approach: an instruction is emitted with
//! unresolved edges, the pending `(instruction, edge)` pairs are parked
//! either in the fallthrough list (resolved by the next emission) or in the
//! enclosing IF frame (resolved at `ENDIF`), and `CALL` targets are resolved
//! in a final pass once every label is known.

use std::sync::Arc;

use crate::error::{BodyError, CompileError, Result};
use crate::instruction::{
    CondBody, Edge, Instruction, InstructionKind, Progress, RuleBody, StepBody,
};
use crate::program::{Program, SubProgram};

// ---------------------------------------------------------------------------
// Program description
// ---------------------------------------------------------------------------

/// One element of a program description.
///
/// The named variants (`Rule`, `Branch`, `BranchRule`) wrap a caller-supplied
/// body; the rest are structural. Descriptions are `Vec<Op<P>>` and an `Op`
/// is cheap to clone (bodies live behind `Arc`), so one description can be
/// compiled into any number of independent [`Program`]s, one per worker.
pub enum Op<P> {
    /// Transform the payload.
    Rule {
        name: String,
        body: Arc<RuleBody<P>>,
    },
    /// Test the payload and set the flag. Outside an `IF`, both exits fall
    /// through to the next instruction.
    Branch {
        name: String,
        body: Arc<CondBody<P>>,
    },
    /// Try to transform the payload; fall through on the false edge when the
    /// body reports no progress.
    BranchRule {
        name: String,
        body: Arc<StepBody<P>>,
    },
    /// Open a conditional; `negated` inverts which exit enters the arm
    /// (the `IF_NOT` form). The inversion is a compile-time edge swap.
    If {
        name: String,
        body: Arc<CondBody<P>>,
        negated: bool,
    },
    /// Close the current arm and open another conditional arm.
    Elif {
        name: String,
        body: Arc<CondBody<P>>,
        negated: bool,
    },
    /// Close the current arm and open the default arm.
    Else,
    /// Close the conditional.
    EndIf,
    /// Terminate with the given value, or carry the current flag.
    Return(Option<bool>),
    /// Open a named sub-program.
    Def(String),
    /// Close the open sub-program, inserting an implicit `RETURN`.
    EndDef,
    /// Jump into a sub-program; execution resumes after the `CALL` when the
    /// sub-program's implicit `RETURN` is reached.
    Call(String),
}

impl<P> Op<P> {
    /// A rule op wrapping `body` under `name`.
    pub fn rule<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(P) -> std::result::Result<P, BodyError> + Send + Sync + 'static,
    {
        Op::Rule {
            name: name.into(),
            body: Arc::new(body),
        }
    }

    /// A branch op wrapping `body` under `name`.
    pub fn branch<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&P) -> std::result::Result<bool, BodyError> + Send + Sync + 'static,
    {
        Op::Branch {
            name: name.into(),
            body: Arc::new(body),
        }
    }

    /// A branch_rule op wrapping `body` under `name`.
    pub fn branch_rule<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(P) -> std::result::Result<Progress<P>, BodyError> + Send + Sync + 'static,
    {
        Op::BranchRule {
            name: name.into(),
            body: Arc::new(body),
        }
    }

    /// The op's name, for ops that carry one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Op::Rule { name, .. }
            | Op::Branch { name, .. }
            | Op::BranchRule { name, .. }
            | Op::If { name, .. }
            | Op::Elif { name, .. } => Some(name),
            Op::Call(label) | Op::Def(label) => Some(label),
            Op::Else | Op::EndIf | Op::EndDef | Op::Return(_) => None,
        }
    }

    fn describe(&self) -> String {
        match self.name() {
            Some(name) => name.to_string(),
            None => match self {
                Op::Else => "ELSE".to_string(),
                Op::EndIf => "ENDIF".to_string(),
                Op::EndDef => "END_DEF".to_string(),
                Op::Return(_) => "RETURN".to_string(),
                _ => unreachable!("named ops are handled above"),
            },
        }
    }
}

impl<P> Clone for Op<P> {
    fn clone(&self) -> Self {
        match self {
            Op::Rule { name, body } => Op::Rule {
                name: name.clone(),
                body: Arc::clone(body),
            },
            Op::Branch { name, body } => Op::Branch {
                name: name.clone(),
                body: Arc::clone(body),
            },
            Op::BranchRule { name, body } => Op::BranchRule {
                name: name.clone(),
                body: Arc::clone(body),
            },
            Op::If {
                name,
                body,
                negated,
            } => Op::If {
                name: name.clone(),
                body: Arc::clone(body),
                negated: *negated,
            },
            Op::Elif {
                name,
                body,
                negated,
            } => Op::Elif {
                name: name.clone(),
                body: Arc::clone(body),
                negated: *negated,
            },
            Op::Else => Op::Else,
            Op::EndIf => Op::EndIf,
            Op::Return(value) => Op::Return(*value),
            Op::Def(label) => Op::Def(label.clone()),
            Op::EndDef => Op::EndDef,
            Op::Call(label) => Op::Call(label.clone()),
        }
    }
}

impl<P> std::fmt::Debug for Op<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Op::Rule { .. } => "Rule",
            Op::Branch { .. } => "Branch",
            Op::BranchRule { .. } => "BranchRule",
            Op::If { .. } => "If",
            Op::Elif { .. } => "Elif",
            Op::Else => "Else",
            Op::EndIf => "EndIf",
            Op::Return(_) => "Return",
            Op::Def(_) => "Def",
            Op::EndDef => "EndDef",
            Op::Call(_) => "Call",
        };
        write!(f, "Op::{}({})", tag, self.describe())
    }
}

// ---------------------------------------------------------------------------
// Description builder
// ---------------------------------------------------------------------------

/// Fluent construction of a program description.
///
/// The builder is the Rust face of the description primitives: structured
/// control flow reads top to bottom the way the compiled graph will run.
///
/// # Example
///
/// ```
/// use ruleflow::{Data, ProgramBuilder};
///
/// let mut program = ProgramBuilder::new()
///     .if_branch("positive", |n: &i64| Ok(*n > 0))
///     .rule("double", |n: i64| Ok(n * 2))
///     .or_else()
///     .rule("negate", |n: i64| Ok(-n))
///     .end_if()
///     .ret_true()
///     .compile()?;
///
/// let (item, flag) = program.run(Data::new(-3))?;
/// assert_eq!(item.payload, 3);
/// assert!(flag);
/// # Ok::<(), ruleflow::Error>(())
/// ```
pub struct ProgramBuilder<P> {
    ops: Vec<Op<P>>,
    invalid: Option<CompileError>,
}

impl<P> ProgramBuilder<P> {
    /// Start an empty description.
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            invalid: None,
        }
    }

    /// Append a prebuilt op, e.g. one produced by the attribute macros.
    pub fn op(mut self, op: Op<P>) -> Self {
        self.ops.push(op);
        self
    }

    /// Append a rule.
    pub fn rule<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(P) -> std::result::Result<P, BodyError> + Send + Sync + 'static,
    {
        self.op(Op::rule(name, body))
    }

    /// Append a standalone branch; both exits fall through, only the flag
    /// changes.
    pub fn branch<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&P) -> std::result::Result<bool, BodyError> + Send + Sync + 'static,
    {
        self.op(Op::branch(name, body))
    }

    /// Append a branch_rule.
    pub fn branch_rule<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(P) -> std::result::Result<Progress<P>, BodyError> + Send + Sync + 'static,
    {
        self.op(Op::branch_rule(name, body))
    }

    /// Open an `IF` on the given condition.
    pub fn if_branch<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&P) -> std::result::Result<bool, BodyError> + Send + Sync + 'static,
    {
        self.op(Op::If {
            name: name.into(),
            body: Arc::new(body),
            negated: false,
        })
    }

    /// Open an `IF_NOT`: the arm runs when the condition is false.
    pub fn if_not<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&P) -> std::result::Result<bool, BodyError> + Send + Sync + 'static,
    {
        self.op(Op::If {
            name: name.into(),
            body: Arc::new(body),
            negated: true,
        })
    }

    /// Close the current arm and open an `ELIF` arm.
    pub fn elif<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&P) -> std::result::Result<bool, BodyError> + Send + Sync + 'static,
    {
        self.op(Op::Elif {
            name: name.into(),
            body: Arc::new(body),
            negated: false,
        })
    }

    /// Close the current arm and open an `ELIF_NOT` arm.
    pub fn elif_not<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&P) -> std::result::Result<bool, BodyError> + Send + Sync + 'static,
    {
        self.op(Op::Elif {
            name: name.into(),
            body: Arc::new(body),
            negated: true,
        })
    }

    /// Open an `IF` on a prebuilt branch op.
    pub fn if_op(self, cond: Op<P>) -> Self {
        self.cond_op(cond, false, false)
    }

    /// Open an `IF_NOT` on a prebuilt branch op.
    pub fn if_not_op(self, cond: Op<P>) -> Self {
        self.cond_op(cond, true, false)
    }

    /// Open an `ELIF` arm on a prebuilt branch op.
    pub fn elif_op(self, cond: Op<P>) -> Self {
        self.cond_op(cond, false, true)
    }

    /// Open an `ELIF_NOT` arm on a prebuilt branch op.
    pub fn elif_not_op(self, cond: Op<P>) -> Self {
        self.cond_op(cond, true, true)
    }

    fn cond_op(mut self, cond: Op<P>, negated: bool, elif: bool) -> Self {
        match cond {
            Op::Branch { name, body } => {
                let op = if elif {
                    Op::Elif {
                        name,
                        body,
                        negated,
                    }
                } else {
                    Op::If {
                        name,
                        body,
                        negated,
                    }
                };
                self.ops.push(op);
            }
            other => {
                if self.invalid.is_none() {
                    self.invalid = Some(CompileError::InvalidCondition(other.describe()));
                }
            }
        }
        self
    }

    /// Close the current arm and open the `ELSE` arm.
    pub fn or_else(mut self) -> Self {
        self.ops.push(Op::Else);
        self
    }

    /// Close the conditional.
    pub fn end_if(mut self) -> Self {
        self.ops.push(Op::EndIf);
        self
    }

    /// Terminate, carrying the current flag.
    pub fn ret(mut self) -> Self {
        self.ops.push(Op::Return(None));
        self
    }

    /// Terminate with flag `true`.
    pub fn ret_true(mut self) -> Self {
        self.ops.push(Op::Return(Some(true)));
        self
    }

    /// Terminate with flag `false`.
    pub fn ret_false(mut self) -> Self {
        self.ops.push(Op::Return(Some(false)));
        self
    }

    /// Open a named sub-program.
    pub fn define(mut self, label: impl Into<String>) -> Self {
        self.ops.push(Op::Def(label.into()));
        self
    }

    /// Close the open sub-program.
    pub fn end_def(mut self) -> Self {
        self.ops.push(Op::EndDef);
        self
    }

    /// Call a sub-program by label.
    pub fn call(mut self, label: impl Into<String>) -> Self {
        self.ops.push(Op::Call(label.into()));
        self
    }

    /// Finish, yielding the description.
    pub fn build(self) -> Result<Vec<Op<P>>> {
        match self.invalid {
            Some(error) => Err(error.into()),
            None => Ok(self.ops),
        }
    }

    /// Finish and compile the description in one step.
    pub fn compile(self) -> Result<Program<P>> {
        compile(self.build()?)
    }
}

impl<P> Default for ProgramBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Compile a program description into a runnable [`Program`].
///
/// Single pass over the ops with a branch-fixup stack, then a resolution
/// pass for `CALL` targets, then edge validation. On any error no partial
/// program is visible to the caller.
pub fn compile<P>(description: Vec<Op<P>>) -> Result<Program<P>> {
    let mut compiler = Compiler::new();
    for op in description {
        compiler.compile_op(op)?;
    }
    Ok(compiler.finish()?)
}

/// One open `IF` during compilation.
struct IfFrame {
    /// The condition whose exit still awaits the next arm (or the end of the
    /// conditional). `None` once `ELSE` consumed it.
    live: Option<(usize, Edge)>,
    /// Ends of completed arms, all resolved to the instruction after `ENDIF`.
    arm_ends: Vec<(usize, Edge)>,
}

/// A sub-program under construction.
struct SubDef {
    label: String,
    entry: usize,
    /// Index of the implicit `RETURN`, set at `END_DEF`.
    ret: Option<usize>,
}

/// A `CALL` awaiting label resolution.
struct CallSite {
    index: usize,
    label: String,
}

/// Fallthrough edge and live edge of a condition, by polarity.
fn polarity(negated: bool) -> (Edge, Edge) {
    if negated {
        (Edge::False, Edge::True)
    } else {
        (Edge::True, Edge::False)
    }
}

struct Compiler<P> {
    instructions: Vec<Instruction<P>>,
    /// Edges resolved to whatever instruction is emitted next.
    fallthrough: Vec<(usize, Edge)>,
    if_stack: Vec<IfFrame>,
    subs: Vec<SubDef>,
    /// Index into `subs` of the currently open `DEF`.
    open_def: Option<usize>,
    calls: Vec<CallSite>,
}

impl<P> Compiler<P> {
    fn new() -> Self {
        Self {
            instructions: Vec::new(),
            fallthrough: Vec::new(),
            if_stack: Vec::new(),
            subs: Vec::new(),
            open_def: None,
            calls: Vec::new(),
        }
    }

    /// Append an instruction, resolving every pending fallthrough edge to it.
    fn emit(&mut self, name: impl Into<String>, kind: InstructionKind<P>) -> usize {
        let index = self.instructions.len();
        for (source, edge) in self.fallthrough.drain(..) {
            self.instructions[source].set_edge(edge, index);
        }
        self.instructions.push(Instruction::new(index, name, kind));
        index
    }

    fn compile_op(&mut self, op: Op<P>) -> std::result::Result<(), CompileError> {
        match op {
            Op::Rule { name, body } => {
                let index = self.emit(name, InstructionKind::Rule(body));
                self.fallthrough.push((index, Edge::True));
                self.fallthrough.push((index, Edge::False));
            }

            Op::Branch { name, body } => {
                let index = self.emit(name, InstructionKind::Branch(body));
                self.fallthrough.push((index, Edge::True));
                self.fallthrough.push((index, Edge::False));
            }

            Op::BranchRule { name, body } => {
                let index = self.emit(name, InstructionKind::BranchRule(body));
                self.fallthrough.push((index, Edge::True));
                self.fallthrough.push((index, Edge::False));
            }

            Op::If {
                name,
                body,
                negated,
            } => {
                let index = self.emit(name, InstructionKind::Branch(body));
                let (fall, live) = polarity(negated);
                self.fallthrough.push((index, fall));
                self.if_stack.push(IfFrame {
                    live: Some((index, live)),
                    arm_ends: Vec::new(),
                });
            }

            Op::Elif {
                name,
                body,
                negated,
            } => {
                let frame = self.if_stack.last_mut().ok_or(CompileError::UnmatchedElif)?;
                let (live_index, live_edge) =
                    frame.live.take().ok_or(CompileError::ElifAfterElse)?;
                frame.arm_ends.extend(self.fallthrough.drain(..));
                let target = self.instructions.len();
                self.instructions[live_index].set_edge(live_edge, target);

                let index = self.emit(name, InstructionKind::Branch(body));
                let (fall, live) = polarity(negated);
                self.fallthrough.push((index, fall));
                if let Some(frame) = self.if_stack.last_mut() {
                    frame.live = Some((index, live));
                }
            }

            Op::Else => {
                let frame = self.if_stack.last_mut().ok_or(CompileError::UnmatchedElse)?;
                let (live_index, live_edge) =
                    frame.live.take().ok_or(CompileError::ElifAfterElse)?;
                frame.arm_ends.extend(self.fallthrough.drain(..));
                let target = self.instructions.len();
                self.instructions[live_index].set_edge(live_edge, target);
            }

            Op::EndIf => {
                let mut frame = self.if_stack.pop().ok_or(CompileError::UnmatchedEndIf)?;
                frame.arm_ends.extend(self.fallthrough.drain(..));
                if let Some(live) = frame.live {
                    self.fallthrough.push(live);
                }
                self.fallthrough.extend(frame.arm_ends);
            }

            Op::Return(value) => {
                self.emit("RETURN", InstructionKind::Return(value));
            }

            Op::Def(label) => {
                if self.open_def.is_some() {
                    return Err(CompileError::NestedDef(label));
                }
                if !self.if_stack.is_empty() {
                    return Err(CompileError::UnclosedIf);
                }
                if self.subs.iter().any(|sub| sub.label == label) {
                    return Err(CompileError::DuplicateLabel(label));
                }
                self.subs.push(SubDef {
                    label,
                    entry: self.instructions.len(),
                    ret: None,
                });
                self.open_def = Some(self.subs.len() - 1);
            }

            Op::EndDef => {
                let open = self.open_def.take().ok_or(CompileError::UnmatchedEndDef)?;
                if !self.if_stack.is_empty() {
                    return Err(CompileError::UnclosedIf);
                }
                let index = self.emit("RETURN", InstructionKind::Return(None));
                self.subs[open].ret = Some(index);
            }

            Op::Call(label) => {
                let name = format!("CALL (\"{label}\")");
                let index = self.emit(
                    name,
                    InstructionKind::Rule(Arc::new(|payload| Ok(payload))),
                );
                self.fallthrough.push((index, Edge::False));
                self.calls.push(CallSite { index, label });
            }
        }
        Ok(())
    }

    fn finish(mut self) -> std::result::Result<Program<P>, CompileError> {
        if let Some(open) = self.open_def {
            return Err(CompileError::UnclosedDef(self.subs[open].label.clone()));
        }
        if !self.if_stack.is_empty() {
            return Err(CompileError::UnclosedIf);
        }
        if self.instructions.is_empty() {
            return Err(CompileError::EmptyProgram);
        }

        self.resolve_calls()?;
        self.validate()?;

        let subs = self
            .subs
            .into_iter()
            .map(|sub| SubProgram {
                label: sub.label,
                entry: sub.entry,
                ret: sub.ret.expect("every recorded DEF was closed by END_DEF"),
            })
            .collect::<Vec<_>>();

        log::debug!(
            "compiled program: {} instructions, {} sub-programs",
            self.instructions.len(),
            subs.len()
        );

        Ok(Program::new(self.instructions, subs))
    }

    /// Point every `CALL` at its sub-program and give the sub-program's
    /// implicit `RETURN` its continuation.
    ///
    /// The first call of a label donates its fallthrough as the
    /// continuation; later calls of the same label resume there too.
    fn resolve_calls(&mut self) -> std::result::Result<(), CompileError> {
        for call in &self.calls {
            let sub = self
                .subs
                .iter()
                .find(|sub| sub.label == call.label)
                .ok_or_else(|| CompileError::UndefinedCall(call.label.clone()))?;
            let ret = sub.ret.expect("every recorded DEF was closed by END_DEF");

            self.instructions[call.index].next_on_true = Some(sub.entry);

            let continuation = self.instructions[call.index].next_on_false;
            if let Some(continuation) = continuation {
                let ret = &mut self.instructions[ret];
                if ret.next_on_true.is_none() {
                    ret.next_on_true = Some(continuation);
                    ret.next_on_false = Some(continuation);
                }
            }
        }
        Ok(())
    }

    /// Check the edge invariants: every non-return edge resolved, every
    /// target in range, no instruction pointing at itself.
    fn validate(&self) -> std::result::Result<(), CompileError> {
        let count = self.instructions.len();
        for instruction in &self.instructions {
            let index = instruction.index;
            for edge in [instruction.next_on_true, instruction.next_on_false] {
                match edge {
                    None if !instruction.is_return() => {
                        return Err(CompileError::UnresolvedEdge { index });
                    }
                    None => {}
                    Some(target) if target >= count => {
                        return Err(CompileError::InvalidEdge { index, target });
                    }
                    Some(target) if target == index => {
                        return Err(CompileError::SelfReference { index });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn noop(name: &str) -> Op<i64> {
        Op::rule(name, Ok)
    }

    #[test]
    fn test_linear_fallthrough_edges() {
        let program = compile(vec![noop("a"), noop("b"), Op::Return(None)]).unwrap();
        assert_eq!(program.instruction(0).next(true), Some(1));
        assert_eq!(program.instruction(0).next(false), Some(1));
        assert_eq!(program.instruction(1).next(true), Some(2));
        assert_eq!(program.instruction(2).next(true), None);
    }

    #[test]
    fn test_if_else_edges() {
        let program = ProgramBuilder::new()
            .if_branch("cond", |n: &i64| Ok(*n > 0))
            .rule("then", Ok)
            .or_else()
            .rule("else", Ok)
            .end_if()
            .ret()
            .compile()
            .unwrap();

        assert_eq!(program.instruction(0).next(true), Some(1));
        assert_eq!(program.instruction(0).next(false), Some(2));
        assert_eq!(program.instruction(1).next(true), Some(3));
        assert_eq!(program.instruction(2).next(true), Some(3));
    }

    #[test]
    fn test_if_not_swaps_edges() {
        let program = ProgramBuilder::new()
            .if_not("cond", |n: &i64| Ok(*n > 0))
            .rule("then", Ok)
            .end_if()
            .ret()
            .compile()
            .unwrap();

        // The arm is entered on the false exit; the true exit skips it.
        assert_eq!(program.instruction(0).next(false), Some(1));
        assert_eq!(program.instruction(0).next(true), Some(2));
    }

    #[test]
    fn test_elif_chain_edges() {
        let program = ProgramBuilder::new()
            .if_branch("a", |n: &i64| Ok(*n > 0))
            .rule("ra", Ok)
            .elif("b", |n: &i64| Ok(*n < 0))
            .rule("rb", Ok)
            .or_else()
            .rule("rc", Ok)
            .end_if()
            .ret()
            .compile()
            .unwrap();

        assert_eq!(program.instruction(0).next(true), Some(1)); // a -> ra
        assert_eq!(program.instruction(0).next(false), Some(2)); // a -> b
        assert_eq!(program.instruction(2).next(true), Some(3)); // b -> rb
        assert_eq!(program.instruction(2).next(false), Some(4)); // b -> rc
        for arm_end in [1, 3, 4] {
            assert_eq!(program.instruction(arm_end).next(true), Some(5));
        }
    }

    #[test]
    fn test_empty_arm_resolves_past_endif() {
        let program = ProgramBuilder::new()
            .if_branch("cond", |n: &i64| Ok(*n > 0))
            .end_if()
            .ret()
            .compile()
            .unwrap();
        assert_eq!(program.instruction(0).next(true), Some(1));
        assert_eq!(program.instruction(0).next(false), Some(1));
    }

    #[test]
    fn test_call_links_trampoline_and_return() {
        let program = ProgramBuilder::<i64>::new()
            .call("sub")
            .ret()
            .define("sub")
            .rule("work", Ok)
            .end_def()
            .compile()
            .unwrap();

        // trampoline jumps into the sub-program, its fallthrough is the
        // continuation, and the implicit RETURN resumes there
        assert_eq!(program.instruction(0).next(true), Some(2));
        assert_eq!(program.instruction(0).next(false), Some(1));
        assert_eq!(program.instruction(3).next(true), Some(1));
        assert_eq!(program.instruction(3).next(false), Some(1));
        assert_eq!(program.sub_program("sub"), Some(2));
    }

    #[test]
    fn test_unmatched_markers() {
        let err = |ops: Vec<Op<i64>>| match compile(ops) {
            Err(Error::Compile(e)) => e,
            other => panic!("expected compile error, got {other:?}"),
        };

        assert_eq!(err(vec![Op::EndIf]), CompileError::UnmatchedEndIf);
        assert_eq!(err(vec![Op::Else]), CompileError::UnmatchedElse);
        assert_eq!(
            err(vec![Op::Elif {
                name: "c".into(),
                body: Arc::new(|_| Ok(true)),
                negated: false,
            }]),
            CompileError::UnmatchedElif
        );
        assert_eq!(err(vec![Op::EndDef]), CompileError::UnmatchedEndDef);
    }

    #[test]
    fn test_open_if_at_end_is_an_error() {
        let description: Vec<Op<i64>> = vec![
            Op::If {
                name: "cond".into(),
                body: Arc::new(|n| Ok(*n > 0)),
                negated: false,
            },
            Op::Return(None),
        ];
        match compile(description) {
            Err(Error::Compile(CompileError::UnclosedIf)) => {}
            other => panic!("expected UnclosedIf, got {other:?}"),
        }
    }

    #[test]
    fn test_else_after_else_is_an_error() {
        let result = ProgramBuilder::<i64>::new()
            .if_branch("cond", |n| Ok(*n > 0))
            .or_else()
            .or_else()
            .end_if()
            .ret()
            .compile();
        match result {
            Err(Error::Compile(CompileError::ElifAfterElse)) => {}
            other => panic!("expected ElifAfterElse, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_label_is_an_error() {
        let result = ProgramBuilder::<i64>::new()
            .ret()
            .define("sub")
            .end_def()
            .define("sub")
            .end_def()
            .compile();
        match result {
            Err(Error::Compile(CompileError::DuplicateLabel(label))) => {
                assert_eq!(label, "sub");
            }
            other => panic!("expected DuplicateLabel, got {other:?}"),
        }
    }

    #[test]
    fn test_undefined_call_is_an_error() {
        let result = ProgramBuilder::<i64>::new().call("missing").ret().compile();
        match result {
            Err(Error::Compile(CompileError::UndefinedCall(label))) => {
                assert_eq!(label, "missing");
            }
            other => panic!("expected UndefinedCall, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_description_is_an_error() {
        match compile(Vec::<Op<i64>>::new()) {
            Err(Error::Compile(CompileError::EmptyProgram)) => {}
            other => panic!("expected EmptyProgram, got {other:?}"),
        }
    }

    #[test]
    fn test_dangling_rule_is_an_error() {
        match compile(vec![noop("dangling")]) {
            Err(Error::Compile(CompileError::UnresolvedEdge { index: 0 })) => {}
            other => panic!("expected UnresolvedEdge, got {other:?}"),
        }
    }

    #[test]
    fn test_non_branch_condition_is_an_error() {
        let result = ProgramBuilder::new()
            .if_op(noop("not-a-branch"))
            .rule("then", Ok)
            .end_if()
            .ret()
            .compile();
        match result {
            Err(Error::Compile(CompileError::InvalidCondition(name))) => {
                assert_eq!(name, "not-a-branch");
            }
            other => panic!("expected InvalidCondition, got {other:?}"),
        }
    }
}
