//! Verification-guided refinement engine.
//!
//! Drives prompt assembly, generation, extraction, verification and the
//! one-shot port repair through a bounded number of iterations. Every
//! failure mode resolves to a [`RefinementOutcome`]; `run` never errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn, Instrument};

use crate::artifact::ArtifactSink;
use crate::config::AgentConfig;
use crate::domain::{ContextSet, ErrorCategory, Task};
use crate::extract::{extract, extract_interface_name, structure_defect};
use crate::generation::{GenerationError, Generator};
use crate::obs;
use crate::ports::{self, PortReport};
use crate::prompt::{PromptBuilder, PromptKind};
use crate::report::{IterationRecord, IterationResult, RefinementLog};
use crate::verifier::Verifier;

/// Loop policy.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_iterations: u32,
    pub enable_port_validation: bool,
    pub temperature: f32,
    /// Pause after a failed verification before the next iteration.
    pub retry_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            enable_port_validation: true,
            temperature: 0.7,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl From<&AgentConfig> for EngineConfig {
    fn from(config: &AgentConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            enable_port_validation: config.enable_port_validation,
            temperature: config.temperature,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Engine states, for transition logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Init,
    Generate,
    Extract,
    Verify,
    PortCheck,
    Retry,
    Accept,
    Exhausted,
    Aborted,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Init => "init",
            EngineState::Generate => "generate",
            EngineState::Extract => "extract",
            EngineState::Verify => "verify",
            EngineState::PortCheck => "port_check",
            EngineState::Retry => "retry",
            EngineState::Accept => "accept",
            EngineState::Exhausted => "exhausted",
            EngineState::Aborted => "aborted",
        }
    }
}

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Accepted,
    /// Generation failed before any code existed.
    GenerationUnavailable,
    /// The target artifact could not be written.
    ArtifactWriteFailed,
    Exhausted,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Accepted => "accepted",
            Termination::GenerationUnavailable => "generation_unavailable",
            Termination::ArtifactWriteFailed => "artifact_write_failed",
            Termination::Exhausted => "exhausted",
        }
    }
}

/// Result of the port repair sub-attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairResolution {
    /// Repaired code verified and uses every port.
    Repaired,
    /// Repaired code verified but ports are still incomplete; accepted anyway.
    RepairedIncomplete,
    /// Repaired code failed verification; artifact restored to the original.
    Reverted,
    /// Repair generation produced nothing; original accepted.
    GenerationFailed,
}

impl RepairResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairResolution::Repaired => "repaired",
            RepairResolution::RepairedIncomplete => "repaired_incomplete",
            RepairResolution::Reverted => "reverted",
            RepairResolution::GenerationFailed => "generation_failed",
        }
    }
}

/// Terminal result of a run.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub success: bool,
    /// Accepted code on success; otherwise the last generated code, if any.
    pub code: Option<String>,
    /// Last code that passed the compile gate.
    pub best_compiling: Option<String>,
    pub iterations_used: u32,
    pub termination: Termination,
    pub log: RefinementLog,
}

impl RefinementOutcome {
    pub fn generation_calls(&self) -> u32 {
        self.log.generation_calls
    }

    pub fn repair_calls(&self) -> u32 {
        self.log.repair_calls
    }
}

/// Mutable state owned by a single run.
struct RunState {
    log: RefinementLog,
    state: EngineState,
    code: Option<String>,
    errors: String,
    best_compiling: Option<String>,
    started: Instant,
}

impl RunState {
    fn transition(&mut self, iteration: u32, next: EngineState) {
        obs::emit_state_transition(iteration, self.state.as_str(), next.as_str());
        self.state = next;
    }

    fn has_code(&self) -> bool {
        self.code.as_deref().is_some_and(|code| !code.is_empty())
    }
}

/// What an iteration decided.
enum Step {
    Continue,
    Stop(Termination),
}

pub struct RefinementEngine {
    config: EngineConfig,
    prompts: PromptBuilder,
    generator: Arc<dyn Generator>,
    verifier: Arc<dyn Verifier>,
    artifact: Arc<dyn ArtifactSink>,
}

impl RefinementEngine {
    pub fn new(
        config: EngineConfig,
        prompts: PromptBuilder,
        generator: Arc<dyn Generator>,
        verifier: Arc<dyn Verifier>,
        artifact: Arc<dyn ArtifactSink>,
    ) -> Self {
        Self {
            config,
            prompts,
            generator,
            verifier,
            artifact,
        }
    }

    /// Run the refinement loop to completion.
    pub async fn run(&self, task: &Task, context: &ContextSet) -> RefinementOutcome {
        let log = RefinementLog::new(task, self.config.max_iterations);
        let span = obs::run_span(&log.run_id);
        self.drive(log, task, context).instrument(span).await
    }

    async fn drive(
        &self,
        log: RefinementLog,
        task: &Task,
        context: &ContextSet,
    ) -> RefinementOutcome {
        obs::emit_run_started(
            &log.run_id,
            self.config.max_iterations,
            &self.artifact.describe(),
        );

        let mut run = RunState {
            log,
            state: EngineState::Init,
            code: None,
            errors: String::new(),
            best_compiling: None,
            started: Instant::now(),
        };

        for iteration in 1..=self.config.max_iterations {
            info!(
                iteration = iteration,
                max_iterations = self.config.max_iterations,
                "Starting iteration"
            );
            match self.iterate(&mut run, task, context, iteration).await {
                Step::Continue => {}
                Step::Stop(termination) => return self.finish(run, termination, iteration),
            }
        }

        warn!(
            max_iterations = self.config.max_iterations,
            "Max iterations reached; verification did not pass"
        );
        run.transition(self.config.max_iterations, EngineState::Exhausted);
        self.finish(run, Termination::Exhausted, self.config.max_iterations)
    }

    async fn iterate(
        &self,
        run: &mut RunState,
        task: &Task,
        context: &ContextSet,
        iteration: u32,
    ) -> Step {
        run.transition(iteration, EngineState::Generate);
        let (kind, prompt) = match run.code.as_deref() {
            Some(previous) if iteration > 1 => {
                let category = ErrorCategory::categorize(&run.errors);
                let prompt = self.prompts.refinement(
                    task,
                    previous,
                    &run.errors,
                    category,
                    iteration - 1,
                );
                (PromptKind::Refinement, prompt)
            }
            _ => (PromptKind::Initial, self.prompts.initial(task, context)),
        };
        debug!(iteration = iteration, prompt = %prompt, "Prompt sent to model");

        let mut record = IterationRecord::new(iteration, kind, prompt.len());
        run.log.generation_calls += 1;
        let response = match self.generate(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                error!(iteration = iteration, error = %e, "Generation failed");
                record.result = IterationResult::GenerationFailed;
                self.close_iteration(run, record);
                if run.has_code() {
                    info!(iteration = iteration, "Keeping previous code");
                    return Step::Continue;
                }
                run.transition(iteration, EngineState::Aborted);
                return Step::Stop(Termination::GenerationUnavailable);
            }
        };
        debug!(iteration = iteration, response = %response, "Response from model");
        record.response_chars = Some(response.len());

        run.transition(iteration, EngineState::Extract);
        let code = extract(&response);
        record.interface_name = extract_interface_name(&code);
        run.code = Some(code.clone());

        if let Some(defect) = structure_defect(&code) {
            warn!(iteration = iteration, defect = %defect, "Code failed basic structure validation");
            run.errors = format!("Code structure validation failed: {defect}");
            record.result = IterationResult::InvalidStructure;
            self.close_iteration(run, record);
            run.transition(iteration, EngineState::Retry);
            return Step::Continue;
        }
        debug!(iteration = iteration, code = %code, "Extracted code");

        if let Err(e) = self.artifact.write(&code) {
            error!(iteration = iteration, error = %e, "Failed to write code");
            record.result = IterationResult::WriteFailed;
            self.close_iteration(run, record);
            run.code = None;
            run.transition(iteration, EngineState::Aborted);
            return Step::Stop(Termination::ArtifactWriteFailed);
        }

        run.transition(iteration, EngineState::Verify);
        let report = self.verifier.verify().await;
        if report.compile_passed() {
            run.best_compiling = Some(code.clone());
        }

        if !report.is_pass() {
            run.errors = report.errors().to_string();
            let category = ErrorCategory::categorize(&run.errors);
            obs::emit_verification_failed(iteration, category.as_str(), &run.errors);
            record.result = if report.compile_passed() {
                IterationResult::TestFailed
            } else {
                IterationResult::CompileFailed
            };
            record.error_category = Some(category);
            self.close_iteration(run, record);
            run.transition(iteration, EngineState::Retry);
            if iteration < self.config.max_iterations {
                tokio::time::sleep(self.config.retry_delay).await;
            }
            return Step::Continue;
        }

        run.errors.clear();
        if self.config.enable_port_validation {
            run.transition(iteration, EngineState::PortCheck);
            let port_report = ports::analyze(&code);
            if !port_report.all_ports_used() {
                run.log.repair_calls += 1;
                let (accepted, resolution) = self.repair_ports(&code, &port_report, iteration).await;
                obs::emit_port_repair(iteration, resolution.as_str());
                record.port_repair = Some(resolution);
                if accepted != code {
                    run.best_compiling = Some(accepted.clone());
                }
                run.code = Some(accepted);
            }
        }

        record.result = IterationResult::Accepted;
        self.close_iteration(run, record);
        run.transition(iteration, EngineState::Accept);
        Step::Stop(Termination::Accepted)
    }

    /// One-shot port repair. Returns the code to accept and how the attempt
    /// resolved. The artifact never ends up holding code that failed
    /// verification.
    async fn repair_ports(
        &self,
        original: &str,
        report: &PortReport,
        iteration: u32,
    ) -> (String, RepairResolution) {
        warn!(iteration = iteration, "Code compiles but ports are incomplete");
        info!(feedback = %report.feedback, "Port usage analysis");

        let prompt = self.prompts.port_repair(
            original,
            &report.unused_inputs,
            &report.unassigned_outputs,
        );
        debug!(iteration = iteration, prompt = %prompt, "Port repair prompt");

        let response = match self.generate(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Port refinement generation failed, accepting compilable code");
                return (original.to_string(), RepairResolution::GenerationFailed);
            }
        };
        let repaired = extract(&response);
        debug!(iteration = iteration, code = %repaired, "Port repaired code");

        if let Err(e) = self.artifact.write(&repaired) {
            warn!(error = %e, "Failed to write repaired code, keeping original");
            self.restore(original);
            return (original.to_string(), RepairResolution::Reverted);
        }

        let recheck = self.verifier.verify().await;
        if !recheck.is_pass() {
            warn!(errors = %recheck.errors(), "Port refinement broke verification, reverting");
            self.restore(original);
            return (original.to_string(), RepairResolution::Reverted);
        }

        if ports::analyze(&repaired).all_ports_used() {
            info!(iteration = iteration, "All ports used after port refinement");
            (repaired, RepairResolution::Repaired)
        } else {
            warn!("Ports still incomplete, but accepting compilable code");
            (repaired, RepairResolution::RepairedIncomplete)
        }
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        let response = self
            .generator
            .generate(prompt, self.config.temperature)
            .await?;
        if response.trim().is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(response)
    }

    fn restore(&self, original: &str) {
        if let Err(e) = self.artifact.write(original) {
            error!(error = %e, target = %self.artifact.describe(), "Failed to restore original code");
        }
    }

    fn close_iteration(&self, run: &mut RunState, record: IterationRecord) {
        obs::emit_iteration_finished(
            record.iteration,
            self.config.max_iterations,
            record.result.as_str(),
        );
        run.log.record(record);
    }

    fn finish(
        &self,
        mut run: RunState,
        termination: Termination,
        iterations_used: u32,
    ) -> RefinementOutcome {
        run.log.finish(termination);
        obs::emit_run_finished(
            &run.log.run_id,
            run.log.success,
            termination.as_str(),
            iterations_used,
            run.started.elapsed().as_millis() as u64,
        );

        let code = match termination {
            Termination::GenerationUnavailable | Termination::ArtifactWriteFailed => None,
            Termination::Accepted | Termination::Exhausted => run.code,
        };

        RefinementOutcome {
            success: termination == Termination::Accepted,
            code,
            best_compiling: run.best_compiling,
            iterations_used,
            termination,
            log: run.log,
        }
    }
}
