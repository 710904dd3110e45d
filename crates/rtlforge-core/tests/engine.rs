//! End-to-end refinement loop behaviour against scripted collaborators.

use std::sync::Arc;
use std::time::Duration;

use rtlforge_core::fakes::{MemoryArtifact, ScriptedGenerator, ScriptedVerifier};
use rtlforge_core::{
    ContextSet, EngineConfig, ErrorCategory, GenerationError, IterationResult, PromptBuilder,
    PromptKind, RefinementEngine, RepairResolution, Task, Termination, VerificationReport,
};

const GOOD: &str = "module counter(input clk, input rst, output reg [7:0] q);
  always @(posedge clk) begin
    if (rst) q <= 0;
    else q <= q + 1;
  end
endmodule";

const BAD: &str = "module counter(input clk, input rst, output reg [7:0] q);
  always @(posedge clk) begin
    if (rst) q <= 0
  end
endmodule";

const MISSING_DONE: &str = "module counter(input clk, input rst, output reg [7:0] q, output done);
  always @(posedge clk) begin
    if (rst) q <= 0;
    else q <= q + 1;
  end
endmodule";

const REPAIRED: &str = "module counter(input clk, input rst, output reg [7:0] q, output done);
  always @(posedge clk) begin
    if (rst) q <= 0;
    else q <= q + 1;
  end
  assign done = (q == 8'hFF);
endmodule";

const STILL_MISSING: &str = "module counter(input clk, input rst, output reg [7:0] q, output done);
  // wrap at 255
  always @(posedge clk) begin
    if (rst) q <= 0;
    else q <= q + 1;
  end
endmodule";

struct Harness {
    generator: Arc<ScriptedGenerator>,
    verifier: Arc<ScriptedVerifier>,
    artifact: Arc<MemoryArtifact>,
    engine: RefinementEngine,
}

fn harness(
    generator: ScriptedGenerator,
    verifier: ScriptedVerifier,
    artifact: MemoryArtifact,
    max_iterations: u32,
    enable_port_validation: bool,
) -> Harness {
    let generator = Arc::new(generator);
    let verifier = Arc::new(verifier);
    let artifact = Arc::new(artifact);
    let config = EngineConfig {
        max_iterations,
        enable_port_validation,
        temperature: 0.7,
        retry_delay: Duration::ZERO,
    };
    let engine = RefinementEngine::new(
        config,
        PromptBuilder::new(true, 10, 8192),
        generator.clone(),
        verifier.clone(),
        artifact.clone(),
    );
    Harness {
        generator,
        verifier,
        artifact,
        engine,
    }
}

fn task() -> Task {
    Task::new("Design an 8-bit counter with synchronous reset")
}

#[tokio::test]
async fn accepts_on_first_iteration_when_everything_passes() {
    let h = harness(
        ScriptedGenerator::new().respond(format!("```verilog\n{GOOD}\n```")),
        ScriptedVerifier::new(),
        MemoryArtifact::new(),
        3,
        true,
    );

    let outcome = h.engine.run(&task(), &ContextSet::new()).await;

    assert!(outcome.success);
    assert_eq!(outcome.termination, Termination::Accepted);
    assert_eq!(outcome.code.as_deref(), Some(GOOD));
    assert_eq!(outcome.best_compiling.as_deref(), Some(GOOD));
    assert_eq!(outcome.iterations_used, 1);
    assert_eq!(outcome.generation_calls(), 1);
    assert_eq!(outcome.repair_calls(), 0);
    assert_eq!(h.artifact.current().as_deref(), Some(GOOD));
    assert_eq!(outcome.log.iterations[0].prompt_kind, PromptKind::Initial);
    assert_eq!(
        outcome.log.iterations[0].interface_name.as_deref(),
        Some("counter")
    );
}

#[tokio::test]
async fn refinement_prompt_carries_category_errors_and_failing_code() {
    let h = harness(
        ScriptedGenerator::new().respond(BAD).respond(GOOD),
        ScriptedVerifier::new()
            .then(VerificationReport::compile_failed(
                "syntax error: unexpected token",
            ))
            .then(VerificationReport::passed()),
        MemoryArtifact::new(),
        3,
        true,
    );

    let outcome = h.engine.run(&task(), &ContextSet::new()).await;

    assert!(outcome.success);
    assert_eq!(outcome.iterations_used, 2);
    let prompts = h.generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("ERROR CATEGORY: syntax"));
    assert!(prompts[1].contains("syntax error: unexpected token"));
    assert!(prompts[1].contains(BAD));
    assert!(prompts[1].contains("PREVIOUS CODE (Iteration 1)"));

    let first = &outcome.log.iterations[0];
    assert_eq!(first.result, IterationResult::CompileFailed);
    assert_eq!(first.error_category, Some(ErrorCategory::Syntax));
    assert_eq!(outcome.log.iterations[1].prompt_kind, PromptKind::Refinement);
}

#[tokio::test]
async fn port_repair_accepts_repaired_code() {
    let h = harness(
        ScriptedGenerator::new().respond(MISSING_DONE).respond(REPAIRED),
        ScriptedVerifier::new(),
        MemoryArtifact::new(),
        3,
        true,
    );

    let outcome = h.engine.run(&task(), &ContextSet::new()).await;

    assert!(outcome.success);
    assert_eq!(outcome.code.as_deref(), Some(REPAIRED));
    assert_eq!(outcome.best_compiling.as_deref(), Some(REPAIRED));
    assert_eq!(outcome.iterations_used, 1);
    assert_eq!(outcome.generation_calls(), 1);
    assert_eq!(outcome.repair_calls(), 1);
    assert_eq!(h.generator.calls(), 2);
    assert!(h.generator.prompts()[1].contains("- UNUSED OUTPUT PORTS: done"));
    assert_eq!(h.artifact.current().as_deref(), Some(REPAIRED));
    assert_eq!(
        outcome.log.iterations[0].port_repair,
        Some(RepairResolution::Repaired)
    );
}

#[tokio::test]
async fn port_repair_reverts_when_repaired_code_fails_verification() {
    let h = harness(
        ScriptedGenerator::new().respond(MISSING_DONE).respond(REPAIRED),
        ScriptedVerifier::new()
            .then(VerificationReport::passed())
            .then(VerificationReport::compile_failed("%Error: t.v:6: syntax error")),
        MemoryArtifact::new(),
        3,
        true,
    );

    let outcome = h.engine.run(&task(), &ContextSet::new()).await;

    assert!(outcome.success);
    assert_eq!(outcome.code.as_deref(), Some(MISSING_DONE));
    assert_eq!(h.artifact.current().as_deref(), Some(MISSING_DONE));
    assert_eq!(
        h.artifact.writes(),
        vec![MISSING_DONE, REPAIRED, MISSING_DONE]
    );
    assert_eq!(
        outcome.log.iterations[0].port_repair,
        Some(RepairResolution::Reverted)
    );
}

#[tokio::test]
async fn port_repair_accepts_compiling_code_with_ports_still_incomplete() {
    let h = harness(
        ScriptedGenerator::new()
            .respond(MISSING_DONE)
            .respond(STILL_MISSING),
        ScriptedVerifier::new(),
        MemoryArtifact::new(),
        3,
        true,
    );

    let outcome = h.engine.run(&task(), &ContextSet::new()).await;

    assert!(outcome.success);
    assert_eq!(outcome.code.as_deref(), Some(STILL_MISSING));
    assert_eq!(h.artifact.current().as_deref(), Some(STILL_MISSING));
    assert_eq!(
        outcome.log.iterations[0].port_repair,
        Some(RepairResolution::RepairedIncomplete)
    );
}

#[tokio::test]
async fn port_repair_generation_failure_keeps_original() {
    let h = harness(
        ScriptedGenerator::new()
            .respond(MISSING_DONE)
            .fail(GenerationError::Transport("connection refused".to_string())),
        ScriptedVerifier::new(),
        MemoryArtifact::new(),
        3,
        true,
    );

    let outcome = h.engine.run(&task(), &ContextSet::new()).await;

    assert!(outcome.success);
    assert_eq!(outcome.code.as_deref(), Some(MISSING_DONE));
    assert_eq!(h.artifact.writes(), vec![MISSING_DONE]);
    assert_eq!(h.verifier.calls(), 1);
    assert_eq!(
        outcome.log.iterations[0].port_repair,
        Some(RepairResolution::GenerationFailed)
    );
}

#[tokio::test]
async fn disabled_port_validation_accepts_incomplete_ports() {
    let h = harness(
        ScriptedGenerator::new().respond(MISSING_DONE),
        ScriptedVerifier::new(),
        MemoryArtifact::new(),
        3,
        false,
    );

    let outcome = h.engine.run(&task(), &ContextSet::new()).await;

    assert!(outcome.success);
    assert_eq!(outcome.code.as_deref(), Some(MISSING_DONE));
    assert_eq!(h.generator.calls(), 1);
    assert_eq!(outcome.log.iterations[0].port_repair, None);
}

#[tokio::test]
async fn generation_failure_without_code_terminates_immediately() {
    let h = harness(
        ScriptedGenerator::new().fail(GenerationError::Timeout(300)),
        ScriptedVerifier::new(),
        MemoryArtifact::new(),
        3,
        true,
    );

    let outcome = h.engine.run(&task(), &ContextSet::new()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.termination, Termination::GenerationUnavailable);
    assert!(outcome.code.is_none());
    assert_eq!(outcome.iterations_used, 1);
    assert_eq!(h.generator.calls(), 1);
    assert_eq!(h.verifier.calls(), 0);
    assert!(h.artifact.writes().is_empty());
}

#[tokio::test]
async fn exhaustion_returns_last_generated_code() {
    let third = BAD.replace("q <= 0", "q <= 1");
    let h = harness(
        ScriptedGenerator::new()
            .respond(BAD)
            .respond(BAD.replace("q <= 0", "q <= 2"))
            .respond(third.clone()),
        ScriptedVerifier::new().then(VerificationReport::compile_failed(
            "%Error: counter.v:4: syntax error, unexpected end",
        )),
        MemoryArtifact::new(),
        3,
        true,
    );

    let outcome = h.engine.run(&task(), &ContextSet::new()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.termination, Termination::Exhausted);
    assert_eq!(outcome.code.as_deref(), Some(third.as_str()));
    assert!(outcome.best_compiling.is_none());
    assert_eq!(outcome.iterations_used, 3);
    assert_eq!(outcome.generation_calls(), 3);
    assert!(outcome
        .log
        .iterations
        .iter()
        .all(|r| r.result == IterationResult::CompileFailed));
}

#[tokio::test]
async fn main_loop_generation_calls_never_exceed_budget() {
    for max_iterations in 1..=4 {
        let mut generator = ScriptedGenerator::new();
        for _ in 0..max_iterations + 2 {
            generator = generator.respond(BAD);
        }
        let h = harness(
            generator,
            ScriptedVerifier::new().then(VerificationReport::compile_failed("error")),
            MemoryArtifact::new(),
            max_iterations,
            true,
        );

        let outcome = h.engine.run(&task(), &ContextSet::new()).await;

        assert_eq!(h.generator.calls() as u32, max_iterations);
        assert_eq!(outcome.generation_calls(), max_iterations);
        assert_eq!(outcome.repair_calls(), 0);
    }
}

#[tokio::test]
async fn generation_failure_with_previous_code_keeps_it_and_continues() {
    let h = harness(
        ScriptedGenerator::new()
            .respond(BAD)
            .fail(GenerationError::Status {
                status: 429,
                body: "quota".to_string(),
            })
            .respond(GOOD),
        ScriptedVerifier::new()
            .then(VerificationReport::compile_failed("syntax error"))
            .then(VerificationReport::passed()),
        MemoryArtifact::new(),
        3,
        true,
    );

    let outcome = h.engine.run(&task(), &ContextSet::new()).await;

    assert!(outcome.success);
    assert_eq!(outcome.iterations_used, 3);
    assert_eq!(
        outcome.log.iterations[1].result,
        IterationResult::GenerationFailed
    );
    let prompts = h.generator.prompts();
    assert!(prompts[2].contains(BAD));
    assert!(prompts[2].contains("syntax error"));
}

#[tokio::test]
async fn structural_failure_skips_verification_and_feeds_back_defect() {
    let h = harness(
        ScriptedGenerator::new()
            .respond("module broken(input a;\n  assign b = a;\n")
            .respond(GOOD),
        ScriptedVerifier::new(),
        MemoryArtifact::new(),
        3,
        true,
    );

    let outcome = h.engine.run(&task(), &ContextSet::new()).await;

    assert!(outcome.success);
    assert_eq!(outcome.iterations_used, 2);
    assert_eq!(h.verifier.calls(), 1);
    assert_eq!(h.artifact.writes(), vec![GOOD]);
    assert_eq!(
        outcome.log.iterations[0].result,
        IterationResult::InvalidStructure
    );
    assert!(h.generator.prompts()[1].contains("Code structure validation failed"));
}

#[tokio::test]
async fn functional_failure_is_retried_and_tracks_compiling_code() {
    let h = harness(
        ScriptedGenerator::new().respond(GOOD).respond(GOOD),
        ScriptedVerifier::new()
            .then(VerificationReport::test_failed(
                "FAILED test_counter.py::test_wrap - AssertionError",
            ))
            .then(VerificationReport::passed()),
        MemoryArtifact::new(),
        2,
        true,
    );

    let outcome = h.engine.run(&task(), &ContextSet::new()).await;

    assert!(outcome.success);
    assert_eq!(
        outcome.log.iterations[0].result,
        IterationResult::TestFailed
    );
    assert!(h.generator.prompts()[1].contains("AssertionError"));
}

#[tokio::test]
async fn artifact_write_failure_terminates_without_code() {
    let h = harness(
        ScriptedGenerator::new().respond(GOOD),
        ScriptedVerifier::new(),
        MemoryArtifact::failing(),
        3,
        true,
    );

    let outcome = h.engine.run(&task(), &ContextSet::new()).await;

    assert!(!outcome.success);
    assert_eq!(outcome.termination, Termination::ArtifactWriteFailed);
    assert!(outcome.code.is_none());
    assert_eq!(h.verifier.calls(), 0);
}

#[tokio::test]
async fn run_log_survives_report_roundtrip() {
    let h = harness(
        ScriptedGenerator::new().respond(GOOD),
        ScriptedVerifier::new(),
        MemoryArtifact::new(),
        3,
        true,
    );
    let outcome = h.engine.run(&task(), &ContextSet::new()).await;

    let dir = tempfile::tempdir().expect("tempdir");
    rtlforge_core::write_run_report(&outcome.log, dir.path()).expect("write report");
    let loaded =
        rtlforge_core::read_run_report(&outcome.log.run_id, dir.path()).expect("read report");
    assert!(loaded.success);
    assert_eq!(loaded.termination, Some(Termination::Accepted));
    assert_eq!(loaded.iterations.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_delay_separates_failed_iterations_but_not_the_last() {
    let delay = Duration::from_secs(2);
    let generator = Arc::new(
        ScriptedGenerator::new()
            .respond(BAD)
            .respond(BAD)
            .respond(BAD),
    );
    let verifier = Arc::new(
        ScriptedVerifier::new().then(VerificationReport::compile_failed(
            "%Error: rtl/top.sv:3: syntax error, unexpected end",
        )),
    );
    let engine = RefinementEngine::new(
        EngineConfig {
            max_iterations: 3,
            enable_port_validation: true,
            temperature: 0.7,
            retry_delay: delay,
        },
        PromptBuilder::new(true, 10, 8192),
        generator.clone(),
        verifier.clone(),
        Arc::new(MemoryArtifact::new()),
    );

    let start = tokio::time::Instant::now();
    let outcome = engine
        .run(&Task::new("Design an 8-bit counter"), &ContextSet::new())
        .await;

    assert_eq!(outcome.termination, Termination::Exhausted);
    assert_eq!(verifier.calls(), 3);
    assert_eq!(start.elapsed(), delay * 2);
}

#[tokio::test(start_paused = true)]
async fn structural_failure_retries_without_delay() {
    let delay = Duration::from_secs(2);
    let engine = RefinementEngine::new(
        EngineConfig {
            max_iterations: 2,
            enable_port_validation: false,
            temperature: 0.7,
            retry_delay: delay,
        },
        PromptBuilder::new(true, 10, 8192),
        Arc::new(
            ScriptedGenerator::new()
                .respond("I cannot write that module.")
                .respond(GOOD),
        ),
        Arc::new(ScriptedVerifier::new()),
        Arc::new(MemoryArtifact::new()),
    );

    let start = tokio::time::Instant::now();
    let outcome = engine
        .run(&Task::new("Design an 8-bit counter"), &ContextSet::new())
        .await;

    assert!(outcome.success);
    assert_eq!(start.elapsed(), Duration::ZERO);
}
