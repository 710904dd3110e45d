//! Verification outcome types.

use serde::{Deserialize, Serialize};

/// Compile/lint gate result. Warnings alone never produce `Fail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "errors", rename_all = "snake_case")]
pub enum GateOutcome {
    Pass,
    Fail(String),
}

/// Functional-test stage result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "errors", rename_all = "snake_case")]
pub enum FunctionalOutcome {
    Pass,
    Fail(String),
    /// No harness available. Counts as success on its own.
    NotApplicable,
}

/// Combined result of one verification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub compile: GateOutcome,

    /// `None` when the compile gate failed and the test stage was skipped.
    pub functional: Option<FunctionalOutcome>,
}

impl VerificationReport {
    /// Gate passed and the functional test passed or was not applicable.
    pub fn passed() -> Self {
        Self {
            compile: GateOutcome::Pass,
            functional: Some(FunctionalOutcome::NotApplicable),
        }
    }

    pub fn compile_failed(errors: impl Into<String>) -> Self {
        Self {
            compile: GateOutcome::Fail(errors.into()),
            functional: None,
        }
    }

    pub fn test_failed(errors: impl Into<String>) -> Self {
        Self {
            compile: GateOutcome::Pass,
            functional: Some(FunctionalOutcome::Fail(errors.into())),
        }
    }

    pub fn compile_passed(&self) -> bool {
        self.compile == GateOutcome::Pass
    }

    pub fn is_pass(&self) -> bool {
        self.compile_passed()
            && matches!(
                self.functional,
                Some(FunctionalOutcome::Pass | FunctionalOutcome::NotApplicable)
            )
    }

    /// Error text for the next refinement prompt; empty on success.
    pub fn errors(&self) -> &str {
        match (&self.compile, &self.functional) {
            (GateOutcome::Fail(errors), _) => errors,
            (GateOutcome::Pass, Some(FunctionalOutcome::Fail(errors))) => errors,
            _ => "",
        }
    }
}
