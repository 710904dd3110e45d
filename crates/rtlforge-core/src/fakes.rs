//! In-memory fakes for the engine's collaborator traits (testing only)
//!
//! Provides `ScriptedGenerator`, `ScriptedVerifier` and `MemoryArtifact`
//! that satisfy the trait contracts without models, tools or disks.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::artifact::ArtifactSink;
use crate::domain::{Result, VerificationReport};
use crate::generation::{GenerationError, Generator};
use crate::verifier::Verifier;

// ---------------------------------------------------------------------------
// ScriptedGenerator
// ---------------------------------------------------------------------------

/// Replays queued responses in order and records every prompt it receives.
/// An exhausted script answers with [`GenerationError::Empty`].
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<std::result::Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, text: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, error: GenerationError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _temperature: f32,
    ) -> std::result::Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerationError::Empty))
    }
}

// ---------------------------------------------------------------------------
// ScriptedVerifier
// ---------------------------------------------------------------------------

/// Replays queued reports in order; once exhausted it repeats the last one
/// (or passes when nothing was queued).
#[derive(Debug, Default)]
pub struct ScriptedVerifier {
    script: Mutex<VecDeque<VerificationReport>>,
    last: Mutex<Option<VerificationReport>>,
    calls: Mutex<usize>,
}

impl ScriptedVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, report: VerificationReport) -> Self {
        self.script.lock().unwrap().push_back(report);
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Verifier for ScriptedVerifier {
    async fn verify(&self) -> VerificationReport {
        *self.calls.lock().unwrap() += 1;
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        last.clone().unwrap_or_else(VerificationReport::passed)
    }
}

// ---------------------------------------------------------------------------
// MemoryArtifact
// ---------------------------------------------------------------------------

/// Artifact sink that keeps every write in order.
#[derive(Debug, Default)]
pub struct MemoryArtifact {
    writes: Mutex<Vec<String>>,
    fail_writes: bool,
}

impl MemoryArtifact {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every write fails.
    pub fn failing() -> Self {
        Self {
            writes: Mutex::default(),
            fail_writes: true,
        }
    }

    /// Content currently persisted.
    pub fn current(&self) -> Option<String> {
        self.writes.lock().unwrap().last().cloned()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

impl ArtifactSink for MemoryArtifact {
    fn write(&self, code: &str) -> Result<()> {
        if self.fail_writes {
            return Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into());
        }
        self.writes.lock().unwrap().push(code.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
