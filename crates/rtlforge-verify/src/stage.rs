//! Lint tool definitions and output classification.

use std::path::Path;

use serde::{Deserialize, Serialize};

use rtlforge_core::GateOutcome;

use crate::runner::ToolOutput;

/// Diagnostic lines kept in a failure message.
pub const MAX_DIAGNOSTIC_LINES: usize = 50;

/// Supported compile/lint checkers, in fallback order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LintTool {
    /// verilator --lint-only <files>
    Verilator,

    /// iverilog -tnull <files>
    Icarus,
}

impl LintTool {
    pub const FALLBACK_ORDER: [LintTool; 2] = [LintTool::Verilator, LintTool::Icarus];

    pub fn name(&self) -> &'static str {
        match self {
            LintTool::Verilator => "verilator",
            LintTool::Icarus => "icarus",
        }
    }

    /// Executable looked up on `PATH` by default.
    pub fn program(&self) -> &'static str {
        match self {
            LintTool::Verilator => "verilator",
            LintTool::Icarus => "iverilog",
        }
    }

    pub fn flags(&self) -> &'static [&'static str] {
        match self {
            LintTool::Verilator => &["--lint-only"],
            LintTool::Icarus => &["-tnull"],
        }
    }

    pub fn command(&self, files: &[impl AsRef<Path>]) -> Vec<String> {
        self.command_with(&[self.program().to_string()], files)
    }

    /// Same argument shape behind a different launcher (an executable, or
    /// an interpreter plus script).
    pub fn command_with(&self, launcher: &[String], files: &[impl AsRef<Path>]) -> Vec<String> {
        launcher
            .iter()
            .cloned()
            .chain(self.flags().iter().map(|f| f.to_string()))
            .chain(files.iter().map(|f| f.as_ref().display().to_string()))
            .collect()
    }

    /// Decide the gate from a finished run. A nonzero exit whose
    /// diagnostics hold only warning-class errors still passes.
    pub fn classify(&self, output: &ToolOutput) -> GateOutcome {
        let diagnostics = format!("{}{}", output.stderr, output.stdout);
        if output.success() {
            return GateOutcome::Pass;
        }

        let fatal = match self {
            LintTool::Verilator => diagnostics.lines().any(is_fatal_verilator_line),
            LintTool::Icarus => diagnostics.to_lowercase().contains("error:"),
        };

        if fatal {
            GateOutcome::Fail(head_lines(&diagnostics, MAX_DIAGNOSTIC_LINES))
        } else {
            GateOutcome::Pass
        }
    }
}

/// A bare `%Error:` line that is neither the warning summary nor a coded
/// warning promoted to error (`%Error-WIDTH:` and friends).
fn is_fatal_verilator_line(line: &str) -> bool {
    line.contains("%Error:")
        && !line.contains("Exiting due to")
        && !line.to_lowercase().contains("warning(s)")
        && !line.contains("%Error-")
}

/// First `n` lines of `text`, newline-joined.
pub fn head_lines(text: &str, n: usize) -> String {
    text.split('\n').take(n).collect::<Vec<_>>().join("\n")
}
