//! Functional-test stage: cocotb harness driven through pytest.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};
use walkdir::WalkDir;

use rtlforge_core::{extract_interface_name, AgentConfig, FunctionalOutcome};

use crate::error::VerifyError;
use crate::runner::{ToolInvocation, ToolRunner};

/// Output lines kept when no failure marker is found.
pub const MAX_TAIL_LINES: usize = 100;

const FAILURE_MARKERS: [&str; 3] = ["FAILED", "ERROR", "CalledProcessError"];

/// Where to look for test modules, in order: (dir, prefix, suffix).
const TEST_MODULE_PATTERNS: [(&str, &str, &str); 6] = [
    ("verif", "test_", ".py"),
    ("src", "test_", ".py"),
    ("verif", "", "_tb.py"),
    ("src", "", "_tb.py"),
    ("verif", "", ".py"),
    ("src", "", ".py"),
];

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Harness locations, first existing wins.
    pub candidates: Vec<PathBuf>,
    pub code_dir: PathBuf,
    pub rtl_dir: PathBuf,
    /// Working directory of the test process.
    pub run_dir: PathBuf,
    /// Test runner command; the harness path is appended.
    pub runner: Vec<String>,
    pub timeout: Duration,
}

impl From<&AgentConfig> for HarnessConfig {
    fn from(config: &AgentConfig) -> Self {
        Self {
            candidates: config.harness_candidates(),
            code_dir: config.code_dir.clone(),
            rtl_dir: config.rtl_dir(),
            run_dir: config.run_dir(),
            runner: vec!["pytest".to_string(), "-v".to_string(), "-s".to_string()],
            timeout: Duration::from_secs(config.test_timeout_secs),
        }
    }
}

/// First candidate that exists.
pub fn locate_harness(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.exists()).cloned()
}

/// `.sv` and `.v` files under `dir`, sorted by path. Only the top level is
/// searched unless `recursive`.
pub fn find_rtl_files(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "sv" || ext == "v"))
        .collect();
    files.sort();
    files
}

/// Stem of the first test module found under `code_dir`.
pub fn find_test_module(code_dir: &Path) -> Option<String> {
    TEST_MODULE_PATTERNS.iter().find_map(|&(dir, prefix, suffix)| {
        let mut names: Vec<String> = std::fs::read_dir(code_dir.join(dir))
            .ok()?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| name.starts_with(prefix) && name.ends_with(suffix))
            .collect();
        names.sort();
        names
            .into_iter()
            .next()
            .map(|name| name.trim_end_matches(".py").to_string())
    })
}

/// Environment describing the design under test to the harness.
pub fn harness_env(rtl_files: &[PathBuf], code_dir: &Path) -> Vec<(String, String)> {
    let sources = rtl_files
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" ");

    let toplevel = rtl_files
        .first()
        .and_then(|first| {
            std::fs::read_to_string(first)
                .ok()
                .and_then(|code| extract_interface_name(&code))
                .or_else(|| first.file_stem().map(|s| s.to_string_lossy().to_string()))
        })
        .unwrap_or_default();

    let module = find_test_module(code_dir).unwrap_or_else(|| {
        warn!(toplevel = %toplevel, "No test module found, using default");
        format!("test_{toplevel}")
    });

    info!(sources = %sources, toplevel = %toplevel, module = %module, "Harness environment");
    vec![
        ("VERILOG_SOURCES".to_string(), sources),
        ("TOPLEVEL".to_string(), toplevel),
        ("TOPLEVEL_LANG".to_string(), "verilog".to_string()),
        ("SIM".to_string(), "icarus".to_string()),
        ("MODULE".to_string(), module),
    ]
}

/// Everything from the first failure marker on, or the last
/// [`MAX_TAIL_LINES`] lines when there is no marker.
pub fn failure_excerpt(output: &str) -> String {
    let lines: Vec<&str> = output.split('\n').collect();
    match lines
        .iter()
        .position(|line| FAILURE_MARKERS.iter().any(|m| line.contains(m)))
    {
        Some(start) => lines[start..].join("\n"),
        None => lines[lines.len().saturating_sub(MAX_TAIL_LINES)..].join("\n"),
    }
}

/// Runs the functional-test harness when one is present.
#[derive(Debug, Clone)]
pub struct FunctionalTester {
    config: HarnessConfig,
}

impl FunctionalTester {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn harness(&self) -> Option<PathBuf> {
        locate_harness(&self.config.candidates)
    }

    pub async fn run(&self) -> FunctionalOutcome {
        let Some(harness) = self.harness() else {
            info!("Functional tests not available (no harness found)");
            return FunctionalOutcome::NotApplicable;
        };
        info!(harness = %harness.display(), "Running functional tests");

        let rtl_files = find_rtl_files(&self.config.rtl_dir, true);
        if rtl_files.is_empty() {
            warn!(dir = %self.config.rtl_dir.display(), "No RTL files found");
            return FunctionalOutcome::Fail("No RTL files found".to_string());
        }

        if let Err(e) = std::fs::create_dir_all(&self.config.run_dir) {
            warn!(dir = %self.config.run_dir.display(), error = %e, "Cannot create run directory");
        }

        let mut command = self.config.runner.clone();
        command.push(harness.display().to_string());
        let mut invocation =
            ToolInvocation::new(command, self.config.timeout).current_dir(&self.config.run_dir);
        for (key, value) in harness_env(&rtl_files, &self.config.code_dir) {
            invocation = invocation.env(key, value);
        }

        match ToolRunner::execute(&invocation).await {
            Ok(output) => {
                let combined = format!("{}\n{}", output.stdout, output.stderr);
                info!(output = %combined, "Test output");
                if output.success() {
                    info!("Functional tests passed");
                    FunctionalOutcome::Pass
                } else {
                    warn!(exit_code = output.exit_code, "Functional tests failed");
                    FunctionalOutcome::Fail(failure_excerpt(&combined))
                }
            }
            Err(VerifyError::Timeout { timeout, .. }) => {
                warn!(secs = timeout.as_secs(), "Functional tests timed out");
                FunctionalOutcome::Fail(format!(
                    "Tests timed out after {} seconds",
                    timeout.as_secs()
                ))
            }
            Err(e) if e.is_not_found() => {
                info!(error = %e, "Functional tests not available (runner not found)");
                FunctionalOutcome::NotApplicable
            }
            Err(e) => {
                warn!(error = %e, "Error running functional tests");
                FunctionalOutcome::Fail(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_excerpt_from_first_marker() {
        let output = "collected 2 items\ntest_a PASSED\ntest_b FAILED\nassert 1 == 2\n";
        assert_eq!(failure_excerpt(output), "test_b FAILED\nassert 1 == 2\n");
    }

    #[test]
    fn test_failure_excerpt_tail_without_marker() {
        let output: String = (0..150).map(|i| format!("line {i}\n")).collect();
        let excerpt = failure_excerpt(&output);
        assert_eq!(excerpt.split('\n').count(), 100);
        assert!(excerpt.starts_with("line 51"));
        assert!(!excerpt.contains("line 50\n"));
    }

    #[test]
    fn test_find_rtl_files_depth() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("top.sv"), "").unwrap();
        std::fs::write(dir.path().join("alu.v"), "").unwrap();
        std::fs::write(dir.path().join("notes.md"), "").unwrap();
        std::fs::write(dir.path().join("sub/fifo.sv"), "").unwrap();

        let top = find_rtl_files(dir.path(), false);
        assert_eq!(top, vec![dir.path().join("alu.v"), dir.path().join("top.sv")]);
        assert_eq!(find_rtl_files(dir.path(), true).len(), 3);
    }

    #[test]
    fn test_find_test_module_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("verif")).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("verif/helpers.py"), "").unwrap();
        std::fs::write(dir.path().join("src/test_counter.py"), "").unwrap();
        assert_eq!(find_test_module(dir.path()).as_deref(), Some("test_counter"));

        let empty = tempfile::tempdir().expect("tempdir");
        assert!(find_test_module(empty.path()).is_none());
    }

    #[test]
    fn test_harness_env_uses_interface_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rtl = dir.path().join("rtl");
        std::fs::create_dir_all(&rtl).unwrap();
        let top = rtl.join("top.sv");
        std::fs::write(&top, "module counter(input clk); endmodule").unwrap();

        let env = harness_env(&[top.clone()], dir.path());
        let get = |k: &str| env.iter().find(|(key, _)| key == k).map(|(_, v)| v.clone());
        assert_eq!(get("TOPLEVEL").as_deref(), Some("counter"));
        assert_eq!(get("MODULE").as_deref(), Some("test_counter"));
        assert_eq!(get("SIM").as_deref(), Some("icarus"));
        assert_eq!(get("VERILOG_SOURCES"), Some(top.display().to_string()));
    }

    #[tokio::test]
    async fn test_missing_harness_is_not_applicable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tester = FunctionalTester::new(HarnessConfig {
            candidates: vec![dir.path().join("absent.py")],
            code_dir: dir.path().to_path_buf(),
            rtl_dir: dir.path().join("rtl"),
            run_dir: dir.path().join("rundir"),
            runner: vec!["pytest".to_string()],
            timeout: Duration::from_secs(5),
        });
        assert_eq!(tester.run().await, FunctionalOutcome::NotApplicable);
    }
}
