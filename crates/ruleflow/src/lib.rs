//! Ruleflow - a rule-program compiler and instruction-graph virtual machine
//!
//! Ruleflow lets you express a piece of business logic as a structured
//! program of simple rules and conditionals, compiles that program into a
//! flat instruction graph, and runs the graph over data items one at a time
//! while recording per-instruction statistics.
//!
//! # Features
//!
//! - **Structured surface, flat runtime**: programs read as
//!   IF / ELIF / ELSE / ENDIF / RETURN, but compile to a graph of
//!   instructions connected by success/failure edges, with no interpreter
//!   recursion, no runtime frames.
//! - **Per-instruction statistics**: entries, successes, failures, and
//!   elapsed time per instruction, mergeable across worker runs of the same
//!   program shape.
//! - **Visualizations**: a deterministic text listing and a DOT rendering
//!   of any compiled program, optionally annotated with statistics.
//! - **Named sub-programs**: `DEF` / `CALL` split large programs into
//!   reusable pieces, linked by index at compile time.
//!
//! # Quick Start
//!
//! ```
//! use ruleflow::{Data, ProgramBuilder};
//!
//! let mut program = ProgramBuilder::new()
//!     .if_branch("positive", |n: &i64| Ok(*n > 0))
//!     .rule("double", |n: i64| Ok(n * 2))
//!     .or_else()
//!     .rule("negate", |n: i64| Ok(-n))
//!     .end_if()
//!     .ret_true()
//!     .compile()?;
//!
//! let (item, flag) = program.run(Data::new(5))?;
//! assert_eq!(item.payload, 10);
//! assert!(flag);
//!
//! // Every instruction carries its own counters.
//! assert_eq!(program.statistics()[1].item_count, 1);
//! # Ok::<(), ruleflow::Error>(())
//! ```
//!
//! # Execution model
//!
//! The VM starts at instruction 0 with the flag set to true and follows one
//! edge per step: a **rule** transforms the payload and falls through, a
//! **branch** tests the payload and writes the flag, a **branch_rule**
//! either transforms the payload or reports no progress and takes the false
//! edge, and a **return** ends the run (or resumes after a `CALL` when it
//! closes a sub-program). Processing is strictly sequential; one `run` call
//! handles one data item to completion.
//!
//! Rule bodies are fallible. A body failure aborts the run and reaches the
//! caller tagged with the failing instruction; the engine itself recovers
//! nothing, which keeps the VM deterministic and the batch policy in the
//! caller's hands.
//!
//! # Scaling out
//!
//! A program owns its statistics, so parallelism is per worker: compile the
//! same description once per worker, run each worker over its share of the
//! data, then ship [`StatisticRecord`]s back and merge them into a single
//! owner. The merge is commutative and associative.
//!
//! # Not supported
//!
//! - Optimization passes or type checking of rule bodies
//! - Modifying a program after compilation
//! - Parallel execution inside a single program
//! - Cross-program linking

mod compiler;
mod data;
mod error;
mod fingerprint;
mod instruction;
mod program;
mod registry;
mod statistics;
mod visitor;

pub use compiler::{Op, ProgramBuilder, compile};
pub use data::Data;
pub use error::{BodyError, CompileError, Error, Result};
pub use fingerprint::source_fingerprint;
pub use instruction::{Instruction, Progress};
pub use program::Program;
pub use registry::Registry;
pub use statistics::{InstructionStatistic, StatisticRecord};
pub use visitor::{DotVisitor, ProgramVisitor, TextVisitor};

// Re-export the attribute macros when the macros feature is enabled
#[cfg(feature = "macros")]
pub use ruleflow_macros::{branch, branch_rule, rule};
