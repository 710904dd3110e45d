//! Two-stage verification: lint gate, then the functional test.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use rtlforge_core::{
    AgentConfig, FunctionalOutcome, GateOutcome, VerificationReport, Verifier,
};

use crate::harness::{find_rtl_files, FunctionalTester, HarnessConfig};
use crate::lint::LintRunner;

/// Verifies the RTL directory. The functional test runs only after the
/// gate passes.
#[derive(Debug, Clone)]
pub struct VerificationPipeline {
    rtl_dir: PathBuf,
    lint: LintRunner,
    functional: FunctionalTester,
}

impl VerificationPipeline {
    pub fn new(rtl_dir: impl Into<PathBuf>, lint: LintRunner, functional: FunctionalTester) -> Self {
        Self {
            rtl_dir: rtl_dir.into(),
            lint,
            functional,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(
            config.rtl_dir(),
            LintRunner::new(Duration::from_secs(config.lint_timeout_secs)),
            FunctionalTester::new(HarnessConfig::from(config)),
        )
    }

    /// Lint the top-level RTL files.
    pub async fn lint(&self) -> GateOutcome {
        let files = find_rtl_files(&self.rtl_dir, false);
        self.lint.run(&files).await
    }

    pub async fn functional_test(&self) -> FunctionalOutcome {
        self.functional.run().await
    }

    pub async fn run(&self) -> VerificationReport {
        info!("Checking that code compiles");
        let compile = self.lint().await;
        if let GateOutcome::Fail(_) = compile {
            warn!("Compilation failed, skipping functional tests");
            return VerificationReport {
                compile,
                functional: None,
            };
        }

        info!("Code compiles, running functional tests");
        let functional = self.functional_test().await;
        if functional == FunctionalOutcome::NotApplicable {
            info!("No testbench available, compilation success is sufficient");
        }
        VerificationReport {
            compile,
            functional: Some(functional),
        }
    }
}

#[async_trait]
impl Verifier for VerificationPipeline {
    async fn verify(&self) -> VerificationReport {
        self.run().await
    }
}
