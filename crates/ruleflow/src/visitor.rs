//! Program visitors: text listing and DOT graph rendering.
//!
//! Both renderers traverse a compiled program exactly once via
//! [`Program::accept`]: the main segment first, then each named sub-program,
//! with every instruction dispatched by kind. Neither executes anything;
//! edges are read with [`Instruction::next`].
//!
//! [`Program::accept`]: crate::Program::accept

use crate::instruction::Instruction;
use crate::program::Program;
use crate::statistics::InstructionStatistic;

/// One traversal of a compiled program.
///
/// `enter_subprogram` / `leave_subprogram` bracket each segment; the main
/// program comes first and has no label. Within a segment each instruction
/// is dispatched to the method matching its kind (branch_rule counts as a
/// branch).
pub trait ProgramVisitor<P> {
    fn enter_subprogram(&mut self, _label: Option<&str>, _instructions: &[Instruction<P>]) {}

    fn leave_subprogram(&mut self, _label: Option<&str>) {}

    fn visit_rule(&mut self, instruction: &Instruction<P>);

    fn visit_branch(&mut self, instruction: &Instruction<P>);

    fn visit_return(&mut self, instruction: &Instruction<P>);
}

/// Display name of a return instruction.
fn return_label(value: Option<bool>) -> &'static str {
    match value {
        None => "RETURN",
        Some(true) => "RETURN True",
        Some(false) => "RETURN False",
    }
}

// ---------------------------------------------------------------------------
// Text listing
// ---------------------------------------------------------------------------

/// Renders a program as a flat text listing.
///
/// Each instruction becomes a `NNNN NAME` line (index right-justified to
/// four columns); branches add indented `# True  ->` / `# False  ->`
/// comment lines naming their successor indices. With statistics attached,
/// rule and return lines carry their entry count and branch comments carry
/// the success/failure counts.
pub struct TextVisitor<'a> {
    lines: Vec<String>,
    statistics: Option<&'a [InstructionStatistic]>,
}

impl<'a> TextVisitor<'a> {
    /// A listing of the program shape only.
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            statistics: None,
        }
    }

    /// A listing annotated with execution counters.
    pub fn with_statistics(statistics: &'a [InstructionStatistic]) -> Self {
        Self {
            lines: Vec::new(),
            statistics: Some(statistics),
        }
    }

    /// The accumulated listing.
    pub fn finish(self) -> String {
        self.lines.join("\n")
    }

    fn statistic(&self, index: usize) -> Option<&'a InstructionStatistic> {
        self.statistics.map(|statistics| &statistics[index])
    }

    fn add_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn add_comment(&mut self, comment: String) {
        self.add_line(format!("     {comment}"));
    }

    fn add_code(&mut self, index: usize, text: String) {
        self.add_line(format!("{index:4} {text}"));
    }

    fn add_instruction_line(&mut self, index: usize, name: &str) {
        match self.statistic(index) {
            Some(statistic) => {
                self.add_code(index, format!("{name}   (*{})", statistic.item_count));
            }
            None => self.add_code(index, name.to_string()),
        }
    }
}

impl Default for TextVisitor<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ProgramVisitor<P> for TextVisitor<'_> {
    fn enter_subprogram(&mut self, label: Option<&str>, _instructions: &[Instruction<P>]) {
        if let Some(label) = label {
            self.add_line("");
            self.add_line(format!("DEF (\"{label}\")"));
        }
    }

    fn leave_subprogram(&mut self, label: Option<&str>) {
        match label {
            None => self.add_line("END OF MAIN PROGRAM"),
            Some(label) => self.add_line(format!("END # {label}")),
        }
    }

    fn visit_rule(&mut self, instruction: &Instruction<P>) {
        self.add_instruction_line(instruction.index(), instruction.name());
    }

    fn visit_branch(&mut self, instruction: &Instruction<P>) {
        let index = instruction.index();
        self.add_code(index, instruction.name().to_string());
        let on_success = instruction
            .next(true)
            .expect("branch edges are resolved at compile time");
        let on_failure = instruction
            .next(false)
            .expect("branch edges are resolved at compile time");
        match self.statistic(index) {
            Some(statistic) => {
                self.add_comment(format!(
                    "  # True  -> {on_success}   (*{})",
                    statistic.success_count
                ));
                self.add_comment(format!(
                    "  # False -> {on_failure}   (*{})",
                    statistic.failure_count
                ));
            }
            None => {
                self.add_comment(format!("  # True  -> {on_success}"));
                self.add_comment(format!("  # False -> {on_failure}"));
            }
        }
    }

    fn visit_return(&mut self, instruction: &Instruction<P>) {
        let name = return_label(instruction.return_value());
        self.add_instruction_line(instruction.index(), name);
    }
}

// ---------------------------------------------------------------------------
// DOT rendering
// ---------------------------------------------------------------------------

/// Renders a program in the DOT graph-description language.
///
/// Every segment becomes a `cluster_…` subgraph (the main program is the
/// unlabelled `cluster_main`), every instruction a `node_<index>` node.
/// Branches emit a labelled edge per exit; everything else emits plain
/// edges. Edges that cross segment boundaries (a `CALL` jumping into a
/// sub-program, or a sub-program return resuming after its call site) are
/// held back and emitted after all clusters are closed, which is what the
/// `compound = true` header is for.
pub struct DotVisitor<'a> {
    lines: Vec<String>,
    inter_cluster_edges: Vec<String>,
    statistics: Option<&'a [InstructionStatistic]>,
    /// Segment ordinal of each instruction, for spotting crossing edges.
    cluster_of: Vec<usize>,
}

impl<'a> DotVisitor<'a> {
    /// A rendering of the program shape only.
    pub fn for_program<P>(program: &'a Program<P>) -> Self {
        Self::build(program, false)
    }

    /// A rendering annotated with execution counters.
    pub fn with_statistics<P>(program: &'a Program<P>) -> Self {
        Self::build(program, true)
    }

    fn build<P>(program: &'a Program<P>, with_statistics: bool) -> Self {
        let mut cluster_of = vec![0; program.len()];
        for (cluster, (_, range)) in program.segments().into_iter().enumerate() {
            for index in range {
                cluster_of[index] = cluster;
            }
        }
        Self {
            lines: vec![
                "digraph {".to_string(),
                String::new(),
                "compound = true;".to_string(),
            ],
            inter_cluster_edges: Vec::new(),
            statistics: with_statistics.then(|| program.statistics()),
            cluster_of,
        }
    }

    /// The accumulated DOT source.
    pub fn finish(self) -> String {
        let mut lines = self.lines;
        if !self.inter_cluster_edges.is_empty() {
            lines.push(String::new());
            lines.push("// inter-cluster-edges".to_string());
            lines.extend(self.inter_cluster_edges);
        }
        lines.push("}".to_string());
        lines.join("\n")
    }

    fn statistic(&self, index: usize) -> Option<&'a InstructionStatistic> {
        self.statistics.map(|statistics| &statistics[index])
    }

    fn escape(text: &str) -> String {
        text.replace('"', "\\\"")
    }

    fn add_node(&mut self, index: usize, label: &str) {
        self.lines
            .push(format!("    node_{index} [label=\"{}\"];", Self::escape(label)));
    }

    /// Emit an edge, routing it to the inter-cluster bucket when its ends
    /// live in different segments.
    fn add_edge(&mut self, from: usize, to: usize, label: &str) {
        let line = if label.is_empty() {
            format!("    node_{from} -> node_{to};")
        } else {
            format!(
                "    node_{from} -> node_{to} [label=\"{}\"];",
                Self::escape(label)
            )
        };
        if self.cluster_of[from] != self.cluster_of[to] {
            self.inter_cluster_edges.push(line);
        } else {
            self.lines.push(line);
        }
    }
}

impl<P> ProgramVisitor<P> for DotVisitor<'_> {
    fn enter_subprogram(&mut self, label: Option<&str>, _instructions: &[Instruction<P>]) {
        self.lines.push(String::new());
        let cluster = Self::escape(label.unwrap_or("main"));
        self.lines.push(format!("subgraph \"cluster_{cluster}\" {{"));
        if let Some(label) = label {
            self.lines
                .push(format!("    label = \"{}\";", Self::escape(label)));
            self.lines.push(String::new());
        }
    }

    fn leave_subprogram(&mut self, _label: Option<&str>) {
        self.lines.push("}".to_string());
    }

    fn visit_rule(&mut self, instruction: &Instruction<P>) {
        let index = instruction.index();
        self.add_node(index, instruction.name());
        let next = instruction
            .next(true)
            .expect("rule edges are resolved at compile time");
        self.add_edge(index, next, "");
    }

    fn visit_branch(&mut self, instruction: &Instruction<P>) {
        let index = instruction.index();
        self.add_node(index, instruction.name());
        let on_success = instruction
            .next(true)
            .expect("branch edges are resolved at compile time");
        let on_failure = instruction
            .next(false)
            .expect("branch edges are resolved at compile time");
        match self.statistic(index) {
            Some(statistic) => {
                self.add_edge(index, on_success, &format!("True: {}", statistic.success_count));
                self.add_edge(index, on_failure, &format!("False: {}", statistic.failure_count));
            }
            None => {
                self.add_edge(index, on_success, "True");
                self.add_edge(index, on_failure, "False");
            }
        }
    }

    fn visit_return(&mut self, instruction: &Instruction<P>) {
        let index = instruction.index();
        let name = return_label(instruction.return_value());
        match self.statistic(index) {
            Some(statistic) => {
                let label = format!("{name}: {}", statistic.item_count);
                self.add_node(index, &label);
            }
            None => self.add_node(index, name),
        }
        // a sub-program return resumes after its first call site
        if let Some(continuation) = instruction.next(true) {
            self.add_edge(index, continuation, "");
        }
    }
}
