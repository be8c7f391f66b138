//! The compiled program and its virtual machine.
//!
//! A [`Program`] is the artifact the compiler produces: an ordered
//! instruction list, a table of named sub-programs, and one statistics slot
//! per instruction. It is immutable after compilation except for the
//! statistics, which [`Program::run`] updates in place.
//!
//! The VM is a plain fetch-dispatch loop over the instruction list, strictly
//! sequential, with no suspension points and no recovery: a failing body
//! propagates to the caller, who decides whether the batch continues.

use std::fmt;
use std::ops::Range;
use std::time::Instant;

use crate::data::Data;
use crate::error::{Error, Result};
use crate::instruction::Instruction;
use crate::statistics::{InstructionStatistic, StatisticRecord};
use crate::visitor::{DotVisitor, ProgramVisitor, TextVisitor};

/// A named sub-program: a contiguous instruction range reachable from
/// `CALL`, linked by index rather than by runtime frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubProgram {
    pub(crate) label: String,
    /// Index of the first instruction.
    pub(crate) entry: usize,
    /// Index of the implicit `RETURN` closing the sub-program.
    pub(crate) ret: usize,
}

/// A compiled rule program.
pub struct Program<P> {
    instructions: Vec<Instruction<P>>,
    subs: Vec<SubProgram>,
    statistics: Vec<InstructionStatistic>,
}

impl<P> Program<P> {
    pub(crate) fn new(instructions: Vec<Instruction<P>>, subs: Vec<SubProgram>) -> Self {
        let statistics = (0..instructions.len())
            .map(InstructionStatistic::new)
            .collect();
        Self {
            instructions,
            subs,
            statistics,
        }
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// A compiled program always has at least one instruction.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction at `index`.
    pub fn instruction(&self, index: usize) -> &Instruction<P> {
        &self.instructions[index]
    }

    /// All instructions, in index order.
    pub fn instructions(&self) -> &[Instruction<P>] {
        &self.instructions
    }

    /// Entry index of the named sub-program.
    pub fn sub_program(&self, label: &str) -> Option<usize> {
        self.subs
            .iter()
            .find(|sub| sub.label == label)
            .map(|sub| sub.entry)
    }

    /// Labels and entry indices of the sub-programs, in definition order.
    pub fn sub_programs(&self) -> impl Iterator<Item = (&str, usize)> {
        self.subs.iter().map(|sub| (sub.label.as_str(), sub.entry))
    }

    /// The main segment followed by each sub-program segment, as
    /// `(label, instruction range)` pairs. The main segment has no label.
    pub(crate) fn segments(&self) -> Vec<(Option<&str>, Range<usize>)> {
        let main_end = self
            .subs
            .first()
            .map_or(self.instructions.len(), |sub| sub.entry);
        let mut segments = vec![(None, 0..main_end)];
        for sub in &self.subs {
            segments.push((Some(sub.label.as_str()), sub.entry..sub.ret + 1));
        }
        segments
    }

    // -----------------------------------------------------------------------
    // Runner
    // -----------------------------------------------------------------------

    /// Process one data item to completion.
    ///
    /// Starts with the flag true at instruction 0 and walks the graph until
    /// a terminal `RETURN`, returning the processed item and the terminal
    /// flag. Statistics are updated in place for every executed instruction;
    /// returns are neither counted nor timed.
    ///
    /// A failing body aborts the run: its statistics slot keeps the entry
    /// count but records neither success nor failure (so
    /// [`InstructionStatistic::had_exception`] turns true), and the error
    /// reaches the caller wrapped with the instruction's index and name.
    pub fn run(&mut self, data: Data<P>) -> Result<(Data<P>, bool)> {
        let Data { id, payload } = data;
        let mut payload = payload;
        let mut flag = true;
        let mut ip = 0;

        loop {
            let instruction = &self.instructions[ip];

            if instruction.is_return() {
                flag = instruction.return_value().unwrap_or(flag);
                match instruction.next(true) {
                    // sub-program return: resume after the call site
                    Some(continuation) => {
                        ip = continuation;
                        continue;
                    }
                    None => break,
                }
            }

            let statistic = &mut self.statistics[ip];
            statistic.item_count += 1;

            let started = Instant::now();
            let (next, new_flag, new_payload) =
                instruction.run(flag, payload).map_err(|source| Error::Body {
                    index: ip,
                    name: instruction.name().to_string(),
                    source,
                })?;
            statistic.run_time += started.elapsed();

            if new_flag {
                statistic.success_count += 1;
            } else {
                statistic.failure_count += 1;
            }

            flag = new_flag;
            payload = new_payload;
            ip = next.expect("non-return instructions have resolved edges");
        }

        log::trace!("data item {id:?} finished with flag {flag}");
        Ok((Data { id, payload }, flag))
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    /// The per-instruction counters, parallel to [`Program::instructions`].
    pub fn statistics(&self) -> &[InstructionStatistic] {
        &self.statistics
    }

    /// Add another run's counters into this program's.
    ///
    /// The other vector must have the same shape: same length, same index in
    /// every slot. Typically `other` is `worker.statistics()` for a worker
    /// program compiled from the same description.
    pub fn merge_statistics(&mut self, other: &[InstructionStatistic]) -> Result<()> {
        if other.len() != self.statistics.len() {
            return Err(Error::StatisticsShape {
                expected: self.statistics.len(),
                found: other.len(),
            });
        }
        for (statistic, incoming) in self.statistics.iter_mut().zip(other) {
            statistic.merge(incoming)?;
        }
        Ok(())
    }

    /// The counters in their persisted form, one record per instruction.
    pub fn statistic_records(&self) -> Vec<StatisticRecord> {
        self.statistics.iter().map(StatisticRecord::from).collect()
    }

    /// Merge a persisted statistics vector into this program's counters.
    ///
    /// The records must match the program shape: one per instruction, index
    /// values consecutive from 0.
    pub fn merge_records(&mut self, records: &[StatisticRecord]) -> Result<()> {
        if records.len() != self.statistics.len() {
            return Err(Error::StatisticsShape {
                expected: self.statistics.len(),
                found: records.len(),
            });
        }
        for (statistic, record) in self.statistics.iter_mut().zip(records) {
            statistic.merge(&record.to_statistic())?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Visualizations
    // -----------------------------------------------------------------------

    /// Walk the program once with a visitor: the main segment first, then
    /// each sub-program, each bracketed by `enter_subprogram` /
    /// `leave_subprogram`.
    pub fn accept<V: ProgramVisitor<P> + ?Sized>(&self, visitor: &mut V) {
        for (label, range) in self.segments() {
            let instructions = &self.instructions[range];
            visitor.enter_subprogram(label, instructions);
            for instruction in instructions {
                instruction.accept(visitor);
            }
            visitor.leave_subprogram(label);
        }
    }

    /// Render the program as a text listing.
    pub fn to_text(&self, with_statistics: bool) -> String {
        let mut visitor = if with_statistics {
            TextVisitor::with_statistics(&self.statistics)
        } else {
            TextVisitor::new()
        };
        self.accept(&mut visitor);
        visitor.finish()
    }

    /// Render the program in the DOT graph-description language.
    pub fn to_dot(&self, with_statistics: bool) -> String {
        let mut visitor = if with_statistics {
            DotVisitor::with_statistics(self)
        } else {
            DotVisitor::for_program(self)
        };
        self.accept(&mut visitor);
        visitor.finish()
    }
}

impl<P> fmt::Debug for Program<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("instructions", &self.instructions)
            .field("subs", &self.subs)
            .finish_non_exhaustive()
    }
}
