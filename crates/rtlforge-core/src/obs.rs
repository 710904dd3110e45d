//! Structured observability hooks for refinement run lifecycle events.
//!
//! Events are emitted at `info!` level (warnings for failures) with an
//! `event` field, so JSON log output can be filtered by event name.

use tracing::{info, warn, Span};

/// Run-scoped span. Attach it to the run future with
/// [`Instrument::instrument`](tracing::Instrument::instrument) so it is only
/// entered while that future is polled.
pub fn run_span(run_id: &str) -> Span {
    tracing::info_span!("rtlforge.run", run_id = %run_id)
}

/// Emit event: run started.
pub fn emit_run_started(run_id: &str, max_iterations: u32, target: &str) {
    info!(
        event = "run.started",
        run_id = %run_id,
        max_iterations = max_iterations,
        target = %target,
    );
}

/// Emit event: engine moved between states.
pub fn emit_state_transition(iteration: u32, from: &str, to: &str) {
    tracing::debug!(event = "engine.transition", iteration = iteration, from = from, to = to);
}

/// Emit event: one iteration finished with the given result.
pub fn emit_iteration_finished(iteration: u32, max_iterations: u32, result: &str) {
    info!(
        event = "iteration.finished",
        iteration = iteration,
        max_iterations = max_iterations,
        result = result,
    );
}

/// Emit event: verification failed with categorized errors.
pub fn emit_verification_failed(iteration: u32, category: &str, errors: &str) {
    let preview: String = errors.chars().take(500).collect();
    warn!(
        event = "verification.failed",
        iteration = iteration,
        category = category,
        errors = %preview,
    );
}

/// Emit event: port repair sub-attempt resolved.
pub fn emit_port_repair(iteration: u32, resolution: &str) {
    info!(event = "port_repair.resolved", iteration = iteration, resolution = resolution);
}

/// Emit event: run finished.
pub fn emit_run_finished(
    run_id: &str,
    success: bool,
    termination: &str,
    iterations_used: u32,
    duration_ms: u64,
) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        success = success,
        termination = termination,
        iterations_used = iterations_used,
        duration_ms = duration_ms,
    );
}
