//! Error types for compilation, execution, and statistics aggregation.
//!
//! Errors are grouped by cause: [`CompileError`] covers everything that can
//! go wrong while turning a program description into a [`Program`], while
//! [`Error`] is the crate-level type that also carries failures raised by
//! rule bodies at run time and statistics-merge mismatches.
//!
//! [`Program`]: crate::Program

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type rule, branch, and branch_rule bodies fail with.
///
/// Bodies are caller-supplied callables; the engine does not constrain their
/// failure type beyond being a sendable error.
pub type BodyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    /// The program description was malformed; see [`CompileError`].
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A rule, branch, or branch_rule body failed while running a data item.
    ///
    /// The engine recovers nothing: the failing instruction's index and name
    /// are attached for diagnostics and the error propagates to the caller,
    /// which decides whether to continue with the next data item.
    #[error("instruction {index} `{name}` failed: {source}")]
    Body {
        index: usize,
        name: String,
        source: BodyError,
    },

    /// Attempt to merge statistics of instructions with different indices.
    ///
    /// Indicates the caller is aggregating statistics from programs with
    /// different instruction shapes.
    #[error("cannot merge statistics: expected instruction {expected}, got {found}")]
    StatisticsMismatch { expected: usize, found: usize },

    /// A persisted statistics vector does not match the program shape.
    #[error("statistics records do not match program: expected {expected} records, got {found}")]
    StatisticsShape { expected: usize, found: usize },
}

/// Error raised synchronously from [`compile`]; fatal to that compilation.
///
/// No partial [`Program`] is ever visible to the caller.
///
/// [`compile`]: crate::compile
/// [`Program`]: crate::Program
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// `ELIF` with no open `IF`.
    #[error("ELIF without matching IF")]
    UnmatchedElif,

    /// `ELSE` with no open `IF`.
    #[error("ELSE without matching IF")]
    UnmatchedElse,

    /// `ENDIF` with no open `IF`.
    #[error("ENDIF without matching IF")]
    UnmatchedEndIf,

    /// A second `ELSE`, or an `ELIF` after `ELSE`, in the same frame.
    #[error("ELIF or ELSE after ELSE in the same IF")]
    ElifAfterElse,

    /// The description ended, or a sub-program boundary was reached, with an
    /// open `IF` frame.
    #[error("IF without matching ENDIF")]
    UnclosedIf,

    /// `END_DEF` with no open `DEF`.
    #[error("END_DEF without matching DEF")]
    UnmatchedEndDef,

    /// The description ended inside a `DEF`.
    #[error("DEF (\"{0}\") without matching END_DEF")]
    UnclosedDef(String),

    /// `DEF` while another `DEF` is still open.
    #[error("DEF (\"{0}\") nested inside another DEF")]
    NestedDef(String),

    /// An op that is not a branch was used as an `IF`/`ELIF` condition.
    #[error("condition `{0}` is not a branch")]
    InvalidCondition(String),

    /// Two sub-programs share a label.
    #[error("duplicate sub-program label \"{0}\"")]
    DuplicateLabel(String),

    /// `CALL` of a label no `DEF` introduces.
    #[error("CALL of undefined sub-program \"{0}\"")]
    UndefinedCall(String),

    /// The description contained no instructions.
    #[error("empty program")]
    EmptyProgram,

    /// An instruction finished compilation with a pending edge, e.g. a rule
    /// with nothing following it.
    #[error("instruction {index} has an unresolved edge")]
    UnresolvedEdge { index: usize },

    /// An edge points outside the instruction list. This is a contract
    /// violation in the compiler itself, not in the description.
    #[error("instruction {index} has an edge to non-existent instruction {target}")]
    InvalidEdge { index: usize, target: usize },

    /// An instruction points at itself.
    #[error("instruction {index} references itself")]
    SelfReference { index: usize },
}
