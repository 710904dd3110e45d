//! Compile/lint gate with tool fallback.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use rtlforge_core::GateOutcome;

use crate::error::VerifyError;
use crate::runner::{ToolInvocation, ToolRunner};
use crate::stage::LintTool;

pub const NO_TOOL_MESSAGE: &str = "No suitable lint tool available (tried Verilator and Icarus)";
pub const NO_FILES_MESSAGE: &str = "No RTL files found";

/// What one tool attempt produced.
enum Attempt {
    Decided(GateOutcome),
    /// Tool unusable; try the next one.
    Unavailable,
}

/// Runs the lint gate, falling back through the configured tools in order.
#[derive(Debug, Clone)]
pub struct LintRunner {
    tools: Vec<(LintTool, Vec<String>)>,
    timeout: Duration,
}

impl LintRunner {
    /// Verilator, then Icarus.
    pub fn new(timeout: Duration) -> Self {
        Self::with_tools(LintTool::FALLBACK_ORDER.to_vec(), timeout)
    }

    pub fn with_tools(tools: Vec<LintTool>, timeout: Duration) -> Self {
        Self {
            tools: tools
                .into_iter()
                .map(|tool| (tool, vec![tool.program().to_string()]))
                .collect(),
            timeout,
        }
    }

    /// Run `tool` through a different executable.
    pub fn with_program(self, tool: LintTool, program: impl Into<String>) -> Self {
        self.with_launcher(tool, vec![program.into()])
    }

    /// Run `tool` through an arbitrary launcher, e.g. `["sh", "wrapper.sh"]`.
    pub fn with_launcher(mut self, tool: LintTool, launcher: Vec<String>) -> Self {
        for (t, l) in &mut self.tools {
            if *t == tool {
                *l = launcher.clone();
            }
        }
        self
    }

    pub async fn run(&self, files: &[impl AsRef<Path>]) -> GateOutcome {
        if files.is_empty() {
            warn!("No RTL files to lint");
            return GateOutcome::Fail(NO_FILES_MESSAGE.to_string());
        }
        info!(files = files.len(), "Linting RTL files");

        for (tool, launcher) in &self.tools {
            match self.attempt(*tool, launcher, files).await {
                Attempt::Decided(outcome) => return outcome,
                Attempt::Unavailable => {
                    info!(tool = tool.name(), "Lint tool unavailable, trying next")
                }
            }
        }

        warn!("No lint tool available");
        GateOutcome::Fail(NO_TOOL_MESSAGE.to_string())
    }

    async fn attempt(
        &self,
        tool: LintTool,
        launcher: &[String],
        files: &[impl AsRef<Path>],
    ) -> Attempt {
        let invocation = ToolInvocation::new(tool.command_with(launcher, files), self.timeout);
        match ToolRunner::execute(&invocation).await {
            Ok(output) => {
                let outcome = tool.classify(&output);
                match &outcome {
                    GateOutcome::Pass if output.success() => {
                        info!(tool = tool.name(), "Lint checks passed")
                    }
                    GateOutcome::Pass => {
                        let warnings: String = format!("{}{}", output.stderr, output.stdout)
                            .chars()
                            .take(500)
                            .collect();
                        info!(tool = tool.name(), warnings = %warnings, "Warnings only, treating as passed")
                    }
                    GateOutcome::Fail(_) => warn!(
                        tool = tool.name(),
                        exit_code = output.exit_code,
                        "Lint checks failed with compilation errors"
                    ),
                }
                Attempt::Decided(outcome)
            }
            Err(VerifyError::Timeout { timeout, .. }) => {
                warn!(tool = tool.name(), secs = timeout.as_secs(), "Lint timeout");
                Attempt::Decided(GateOutcome::Fail(format!(
                    "Lint timeout after {}s",
                    timeout.as_secs()
                )))
            }
            Err(e) if e.is_not_found() => Attempt::Unavailable,
            // Verilator trouble falls through to the next tool; Icarus is the last resort.
            Err(e) => match tool {
                LintTool::Verilator => {
                    warn!(tool = tool.name(), error = %e, "Lint tool error");
                    Attempt::Unavailable
                }
                LintTool::Icarus => Attempt::Decided(GateOutcome::Fail(e.to_string())),
            },
        }
    }
}
