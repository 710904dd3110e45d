//! Agent configuration: defaults, TOML file, environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{ConfigError, Result, RtlforgeError};

const MIN_MAX_LENGTH: u32 = 1024;
const DEFAULT_RUN_LOG: &str = "agent_detailed.log";

/// Runtime configuration for a refinement run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: u32,

    pub slm_api_url: String,
    pub slm_model: String,
    /// Output-length budget in tokens; also sizes the prompt context budget.
    pub slm_max_length: u32,
    pub slm_timeout_secs: u64,
    pub temperature: f32,

    pub use_few_shot_examples: bool,
    pub max_context_files: usize,
    pub enable_port_validation: bool,

    pub test_timeout_secs: u64,
    pub lint_timeout_secs: u64,
    pub retry_delay_ms: u64,

    pub code_dir: PathBuf,
    /// Candidate functional-test harness locations, first existing wins.
    /// Empty means the defaults derived from `code_dir`.
    pub harness_paths: Vec<PathBuf>,
    /// Plain-text log sink. `None` means console only for the auxiliary
    /// commands, and `<code_dir>/rundir/agent_detailed.log` for `run`
    /// (see [`AgentConfig::run_log_file`]).
    pub log_file: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            slm_api_url: "http://host.docker.internal:8000".to_string(),
            slm_model: "deepseek".to_string(),
            slm_max_length: 8192,
            slm_timeout_secs: 300,
            temperature: 0.7,
            use_few_shot_examples: true,
            max_context_files: 10,
            enable_port_validation: true,
            test_timeout_secs: 120,
            lint_timeout_secs: 30,
            retry_delay_ms: 2000,
            code_dir: PathBuf::from("/code"),
            harness_paths: Vec::new(),
            log_file: None,
        }
    }
}

impl AgentConfig {
    /// Load a TOML file on top of the defaults. Missing keys keep defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| RtlforgeError::ConfigFile(format!("{}: {e}", path.display())))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Unparseable values are
    /// ignored with a warning.
    pub fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parsed(&lookup, "RTLFORGE_MAX_ITERATIONS") {
            self.max_iterations = v;
        }
        if let Some(v) = lookup("SLM_API_URL") {
            self.slm_api_url = v;
        }
        if let Some(v) = lookup("SLM_MODEL") {
            self.slm_model = v;
        }
        if let Some(v) = parsed(&lookup, "SLM_MAX_LENGTH") {
            self.slm_max_length = v;
        }
        if let Some(v) = parsed(&lookup, "SLM_TIMEOUT") {
            self.slm_timeout_secs = v;
        }
        if let Some(v) = parsed(&lookup, "SLM_TEMPERATURE") {
            self.temperature = v;
        }
        if let Some(v) = lookup("RTLFORGE_PORT_VALIDATION") {
            match parse_flag(&v) {
                Some(flag) => self.enable_port_validation = flag,
                None => warn!(key = "RTLFORGE_PORT_VALIDATION", value = %v, "Ignoring invalid flag"),
            }
        }
        if let Some(v) = lookup("RTLFORGE_CODE_DIR") {
            self.code_dir = PathBuf::from(v);
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::NotPositive {
                field: "max_iterations",
            });
        }
        if self.slm_timeout_secs == 0 {
            return Err(ConfigError::NotPositive {
                field: "slm_timeout_secs",
            });
        }
        if self.test_timeout_secs == 0 {
            return Err(ConfigError::NotPositive {
                field: "test_timeout_secs",
            });
        }
        if self.lint_timeout_secs == 0 {
            return Err(ConfigError::NotPositive {
                field: "lint_timeout_secs",
            });
        }
        if self.max_context_files == 0 {
            return Err(ConfigError::NotPositive {
                field: "max_context_files",
            });
        }
        if self.slm_max_length < MIN_MAX_LENGTH {
            return Err(ConfigError::MaxLengthTooSmall {
                value: self.slm_max_length,
                min: MIN_MAX_LENGTH,
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::TemperatureOutOfRange(
                self.temperature.to_string(),
            ));
        }
        Ok(())
    }

    pub fn prompt_file(&self) -> PathBuf {
        self.code_dir.join("prompt.json")
    }

    pub fn rtl_dir(&self) -> PathBuf {
        self.code_dir.join("rtl")
    }

    pub fn run_dir(&self) -> PathBuf {
        self.code_dir.join("rundir")
    }

    /// Log file for a full run: the configured one, else the detailed log
    /// under the run directory.
    pub fn run_log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.run_dir().join(DEFAULT_RUN_LOG))
    }

    /// Harness candidates in lookup order.
    pub fn harness_candidates(&self) -> Vec<PathBuf> {
        if !self.harness_paths.is_empty() {
            return self.harness_paths.clone();
        }
        vec![
            PathBuf::from("/src/test_runner.py"),
            self.code_dir.join("src/test_runner.py"),
            PathBuf::from("../src/test_runner.py"),
        ]
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key = key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
