//! Auditable run report with digest verification.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{ErrorCategory, Result, RtlforgeError, Task};
use crate::engine::{RepairResolution, Termination};
use crate::prompt::PromptKind;

/// How a single iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationResult {
    Accepted,
    GenerationFailed,
    InvalidStructure,
    WriteFailed,
    CompileFailed,
    TestFailed,
}

impl IterationResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            IterationResult::Accepted => "accepted",
            IterationResult::GenerationFailed => "generation_failed",
            IterationResult::InvalidStructure => "invalid_structure",
            IterationResult::WriteFailed => "write_failed",
            IterationResult::CompileFailed => "compile_failed",
            IterationResult::TestFailed => "test_failed",
        }
    }
}

/// One attempt in the refinement timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub prompt_kind: PromptKind,
    pub prompt_chars: usize,
    pub response_chars: Option<usize>,
    pub interface_name: Option<String>,
    pub result: IterationResult,
    pub error_category: Option<ErrorCategory>,
    pub port_repair: Option<RepairResolution>,
}

impl IterationRecord {
    pub fn new(iteration: u32, prompt_kind: PromptKind, prompt_chars: usize) -> Self {
        Self {
            iteration,
            prompt_kind,
            prompt_chars,
            response_chars: None,
            interface_name: None,
            result: IterationResult::GenerationFailed,
            error_category: None,
            port_repair: None,
        }
    }
}

/// Full refinement log for artifacts/audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementLog {
    pub run_id: String,
    pub task_digest: String,
    pub max_iterations: u32,
    pub iterations: Vec<IterationRecord>,
    pub generation_calls: u32,
    pub repair_calls: u32,
    pub success: bool,
    pub termination: Option<Termination>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RefinementLog {
    pub fn new(task: &Task, max_iterations: u32) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            task_digest: sha256_hex(task.description().as_bytes()),
            max_iterations,
            iterations: Vec::new(),
            generation_calls: 0,
            repair_calls: 0,
            success: false,
            termination: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, record: IterationRecord) {
        self.iterations.push(record);
    }

    pub fn finish(&mut self, termination: Termination) {
        self.success = termination == Termination::Accepted;
        self.termination = Some(termination);
        self.finished_at = Some(Utc::now());
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Persist `<dir>/<run_id>/report.json` and `<dir>/<run_id>/report.digest`.
pub fn write_run_report(log: &RefinementLog, dir: &Path) -> Result<PathBuf> {
    let run_dir = dir.join(&log.run_id);
    std::fs::create_dir_all(&run_dir)?;

    let report_path = run_dir.join("report.json");
    let digest_path = run_dir.join("report.digest");
    let json = serde_json::to_vec_pretty(log)?;
    let digest = sha256_hex(&json);

    std::fs::write(&report_path, &json)?;
    std::fs::write(&digest_path, digest.as_bytes())?;

    Ok(report_path)
}

/// Read and verify `<dir>/<run_id>/report.json` integrity.
pub fn read_run_report(run_id: &str, dir: &Path) -> Result<RefinementLog> {
    let run_dir = dir.join(run_id);
    let json = std::fs::read(run_dir.join("report.json"))?;
    let digest = std::fs::read_to_string(run_dir.join("report.digest"))?;
    let actual = sha256_hex(&json);
    if digest.trim() != actual {
        return Err(RtlforgeError::DigestMismatch {
            expected: digest.trim().to_string(),
            actual,
        });
    }

    Ok(serde_json::from_slice(&json)?)
}
