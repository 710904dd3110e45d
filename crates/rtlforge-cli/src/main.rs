//! rtlforge - verification-guided HDL generation CLI
//!
//! ## Commands
//!
//! - `run`: generate, verify and refine an RTL module for the task in `<code_dir>/prompt.json`
//! - `lint`: run the compile gate once over a set of files
//! - `ports`: print the port report for an HDL file
//! - `extract`: pull the HDL out of a raw model response
//! - `prompt`: print the initial prompt a run would send

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};

use rtlforge_core::telemetry::init_tracing;
use rtlforge_core::{
    analyze_ports, extract, find_target_file, gather_context, read_task, structure_defect,
    write_run_report, AgentConfig, ContextSet, EngineConfig, FileArtifact, GateOutcome,
    PortReport, PromptBuilder, RefinementEngine, RefinementOutcome, Task,
};
use rtlforge_slm::{SlmClient, SlmConfig};
use rtlforge_verify::{LintRunner, VerificationPipeline};

#[derive(Parser)]
#[command(name = "rtlforge")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verification-guided HDL generation", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file, applied before environment overrides
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and refine the RTL module described by the task
    Run {
        /// Working directory holding prompt.json, docs/, rtl/, verif/
        #[arg(long)]
        code_dir: Option<PathBuf>,

        /// Maximum refinement iterations
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Skip the port-completeness check and repair
        #[arg(long)]
        no_port_validation: bool,

        /// Leave the reference designs out of the initial prompt
        #[arg(long)]
        no_few_shot: bool,

        /// Directory for run reports (default: <code_dir>/.rtlforge/runs)
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },

    /// Run the compile gate once over HDL files
    Lint {
        /// Files to lint
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Report unused inputs and unassigned outputs of an HDL file
    Ports {
        /// HDL file to analyze
        file: PathBuf,
    },

    /// Extract HDL from a raw model response (file or stdin)
    Extract {
        /// Response file; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// Print the initial prompt for the current task
    Prompt {
        /// Working directory holding prompt.json and context
        #[arg(long)]
        code_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    match &cli.command {
        Commands::Run {
            code_dir,
            max_iterations,
            no_port_validation,
            no_few_shot,
            ..
        } => {
            if let Some(dir) = code_dir {
                config.code_dir = dir.clone();
            }
            if let Some(n) = max_iterations {
                config.max_iterations = *n;
            }
            if *no_port_validation {
                config.enable_port_validation = false;
            }
            if *no_few_shot {
                config.use_few_shot_examples = false;
            }
        }
        Commands::Prompt {
            code_dir: Some(dir),
        } => config.code_dir = dir.clone(),
        _ => {}
    }
    config.validate().context("Invalid configuration")?;

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let log_file = match &cli.command {
        Commands::Run { .. } => Some(config.run_log_file()),
        _ => config.log_file.clone(),
    };
    let _log_guard = init_tracing(cli.json, level, log_file.as_deref());

    match cli.command {
        Commands::Run { report_dir, .. } => {
            let report_dir = report_dir.unwrap_or_else(|| default_report_dir(&config));
            // Always exit 0 once the run has been attempted.
            match cmd_run(&config, &report_dir).await {
                RunStatus::Finished(outcome) => {
                    info!(success = outcome.success, "Run complete")
                }
                RunStatus::SetupFailed(reason) => {
                    warn!(reason = %reason, "Run ended before generation")
                }
                RunStatus::EmptyTask => {}
            }
            Ok(())
        }
        Commands::Lint { files } => cmd_lint(&config, &files).await,
        Commands::Ports { file } => {
            let report = cmd_ports(&file)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Extract { file } => cmd_extract(file.as_deref()),
        Commands::Prompt { .. } => {
            println!("{}", cmd_prompt(&config)?);
            Ok(())
        }
    }
}

/// Defaults, then the optional TOML file, then the environment.
fn load_config(path: Option<&Path>) -> Result<AgentConfig> {
    let mut config = match path {
        Some(path) => AgentConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AgentConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

fn default_report_dir(config: &AgentConfig) -> PathBuf {
    config.code_dir.join(".rtlforge").join("runs")
}

fn prompt_builder(config: &AgentConfig) -> PromptBuilder {
    PromptBuilder::new(
        config.use_few_shot_examples,
        config.max_context_files,
        config.slm_max_length,
    )
}

/// How a `run` invocation ended. The process exits 0 for every variant.
#[derive(Debug)]
enum RunStatus {
    EmptyTask,
    SetupFailed(String),
    Finished(Box<RefinementOutcome>),
}

/// Everything the engine needs, gathered before the loop starts.
struct PreparedRun {
    task: Task,
    context: ContextSet,
    target: PathBuf,
    artifact: FileArtifact,
    client: SlmClient,
}

fn prepare_run(config: &AgentConfig) -> Result<Option<PreparedRun>> {
    let task = read_task(&config.prompt_file()).context("Failed to read task")?;
    if task.is_empty() {
        return Ok(None);
    }

    let context = gather_context(&config.code_dir);
    let target = find_target_file(&config.rtl_dir()).context("Failed to choose target file")?;
    let artifact = FileArtifact::new(&target);
    if let Some(backup) = artifact
        .backup()
        .context("Failed to back up target file")?
    {
        info!(backup = %backup.display(), "Backed up existing target");
    }

    let client = SlmClient::new(SlmConfig::from(config)).context("Failed to build SLM client")?;
    Ok(Some(PreparedRun {
        task,
        context,
        target,
        artifact,
        client,
    }))
}

/// Full agent run. Setup and engine failures are logged, never returned.
async fn cmd_run(config: &AgentConfig, report_dir: &Path) -> RunStatus {
    info!(
        code_dir = %config.code_dir.display(),
        api_url = %config.slm_api_url,
        model = %config.slm_model,
        max_iterations = config.max_iterations,
        "Starting rtlforge"
    );

    let prepared = match prepare_run(config) {
        Ok(Some(prepared)) => prepared,
        Ok(None) => {
            warn!("Task prompt is empty, nothing to generate");
            return RunStatus::EmptyTask;
        }
        Err(e) => {
            let reason = format!("{e:#}");
            error!(error = %reason, "Run setup failed");
            return RunStatus::SetupFailed(reason);
        }
    };

    let engine = RefinementEngine::new(
        EngineConfig::from(config),
        prompt_builder(config),
        Arc::new(prepared.client),
        Arc::new(VerificationPipeline::from_config(config)),
        Arc::new(prepared.artifact),
    );

    let outcome = engine.run(&prepared.task, &prepared.context).await;

    match write_run_report(&outcome.log, report_dir) {
        Ok(path) => info!(path = %path.display(), "Wrote run report"),
        Err(e) => warn!(error = %e, "Could not write run report"),
    }

    let target = prepared.target;
    info!("{}", "=".repeat(60));
    if outcome.success {
        info!(
            target = %target.display(),
            iterations = outcome.iterations_used,
            "SUCCESS: module generated and verified"
        );
    } else {
        warn!(
            target = %target.display(),
            iterations = outcome.iterations_used,
            termination = outcome.termination.as_str(),
            has_code = outcome.code.is_some(),
            has_compiling = outcome.best_compiling.is_some(),
            "FAILED: no verified module"
        );
    }
    info!("{}", "=".repeat(60));

    RunStatus::Finished(Box::new(outcome))
}

async fn cmd_lint(config: &AgentConfig, files: &[PathBuf]) -> Result<()> {
    let lint = LintRunner::new(Duration::from_secs(config.lint_timeout_secs));
    match lint.run(files).await {
        GateOutcome::Pass => println!("PASS"),
        GateOutcome::Fail(errors) => {
            println!("FAIL");
            println!("{}", errors);
        }
    }
    Ok(())
}

fn cmd_ports(file: &Path) -> Result<PortReport> {
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    Ok(analyze_ports(&code))
}

fn cmd_extract(file: Option<&Path>) -> Result<()> {
    let response = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let (code, defect) = extract_checked(&response);
    println!("{}", code);
    match defect {
        None => eprintln!("structure: valid"),
        Some(defect) => eprintln!("structure: invalid ({})", defect),
    }
    Ok(())
}

fn extract_checked(response: &str) -> (String, Option<String>) {
    let code = extract(response);
    let defect = structure_defect(&code).map(|d| d.to_string());
    (code, defect)
}

fn cmd_prompt(config: &AgentConfig) -> Result<String> {
    let task = read_task(&config.prompt_file()).context("Failed to read task")?;
    let context = gather_context(&config.code_dir);
    Ok(prompt_builder(config).initial(&task, &context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtlforge_core::{read_run_report, Termination};

    fn config_for(code_dir: &Path) -> AgentConfig {
        AgentConfig {
            code_dir: code_dir.to_path_buf(),
            retry_delay_ms: 0,
            harness_paths: vec![code_dir.join("no_harness.py")],
            ..AgentConfig::default()
        }
    }

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "rtlforge",
            "--verbose",
            "run",
            "--code-dir",
            "/work",
            "--max-iterations",
            "5",
            "--no-port-validation",
        ])
        .expect("parse");
        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                code_dir,
                max_iterations,
                no_port_validation,
                no_few_shot,
                report_dir,
            } => {
                assert_eq!(code_dir, Some(PathBuf::from("/work")));
                assert_eq!(max_iterations, Some(5));
                assert!(no_port_validation);
                assert!(!no_few_shot);
                assert!(report_dir.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_lint_requires_files() {
        assert!(Cli::try_parse_from(["rtlforge", "lint"]).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rtlforge.toml");
        std::fs::write(&path, "max_context_files = 4\nlint_timeout_secs = 10\n").unwrap();
        let config = load_config(Some(&path)).expect("config");
        assert_eq!(config.max_context_files, 4);
        assert_eq!(config.lint_timeout_secs, 10);
    }

    #[test]
    fn test_load_config_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[tokio::test]
    async fn test_run_with_empty_task_exits_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("prompt.json"), r#"{"prompt": ""}"#).unwrap();
        let config = config_for(dir.path());

        let status = cmd_run(&config, &dir.path().join("runs")).await;
        assert!(matches!(status, RunStatus::EmptyTask));
        assert!(!dir.path().join("rtl").exists());
    }

    #[tokio::test]
    async fn test_run_without_task_file_ends_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        match cmd_run(&config, &dir.path().join("runs")).await {
            RunStatus::SetupFailed(reason) => assert!(reason.contains("Failed to read task")),
            other => panic!("expected setup failure, got {other:?}"),
        }
        assert!(!dir.path().join("rtl").exists());
    }

    #[tokio::test]
    async fn test_run_with_malformed_task_ends_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("prompt.json"), "{not json").unwrap();
        let config = config_for(dir.path());
        match cmd_run(&config, &dir.path().join("runs")).await {
            RunStatus::SetupFailed(reason) => assert!(reason.contains("invalid task file")),
            other => panic!("expected setup failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_with_unusable_rtl_dir_ends_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("prompt.json"),
            r#"{"prompt": "Design a 4-bit counter"}"#,
        )
        .unwrap();
        // A regular file where the RTL directory should be.
        std::fs::write(dir.path().join("rtl"), "").unwrap();
        let config = config_for(dir.path());
        match cmd_run(&config, &dir.path().join("runs")).await {
            RunStatus::SetupFailed(reason) => {
                assert!(reason.contains("Failed to choose target file"))
            }
            other => panic!("expected setup failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_with_unreachable_model_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("prompt.json"),
            r#"{"prompt": "Design a 4-bit counter"}"#,
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("rtl")).unwrap();
        std::fs::write(dir.path().join("rtl/top.sv"), "").unwrap();

        // Bind then drop so the port refuses connections.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = AgentConfig {
            slm_api_url: format!("http://{addr}"),
            ..config_for(dir.path())
        };
        let report_dir = dir.path().join("runs");

        let outcome = match cmd_run(&config, &report_dir).await {
            RunStatus::Finished(outcome) => outcome,
            other => panic!("expected finished run, got {other:?}"),
        };
        assert!(!outcome.success);
        assert_eq!(outcome.termination, Termination::GenerationUnavailable);
        assert!(outcome.code.is_none());

        let log = read_run_report(&outcome.log.run_id, &report_dir).expect("report");
        assert_eq!(log.generation_calls, 1);
    }

    #[test]
    fn test_ports_reports_unused_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.sv");
        std::fs::write(
            &path,
            "module m(input logic a, input logic b, output logic y);\n  assign y = a;\nendmodule\n",
        )
        .unwrap();
        let report = cmd_ports(&path).expect("ports");
        assert_eq!(report.unused_inputs, vec!["b".to_string()]);
        assert!(report.unassigned_outputs.is_empty());
    }

    #[test]
    fn test_extract_checked_flags_defects() {
        let (code, defect) =
            extract_checked("Here you go:\n```verilog\nmodule m(); endmodule\n```\n");
        assert_eq!(code, "module m(); endmodule");
        assert!(defect.is_none());

        let (_, defect) = extract_checked("```verilog\nmodule m();\n```");
        assert!(defect.is_some());
    }

    #[test]
    fn test_prompt_includes_task() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("prompt.json"),
            r#"{"prompt": "Design a 4-bit counter"}"#,
        )
        .unwrap();
        let prompt = cmd_prompt(&config_for(dir.path())).expect("prompt");
        assert!(prompt.contains("Design a 4-bit counter"));
    }
}
