//! rtlforge core library
//!
//! Verification-guided HDL generation: response extraction, port analysis,
//! prompt assembly and the bounded refinement engine, plus the collaborator
//! traits the engine consumes.

pub mod artifact;
pub mod config;
pub mod domain;
pub mod engine;
pub mod extract;
pub mod fakes;
pub mod generation;
pub mod obs;
pub mod ports;
pub mod prompt;
pub mod report;
pub mod telemetry;
pub mod verifier;
pub mod workspace;

pub use artifact::{ArtifactSink, FileArtifact};
pub use config::AgentConfig;
pub use domain::{
    ConfigError, ContextClass, ContextFile, ContextSet, ErrorCategory, FunctionalOutcome,
    GateOutcome, Result, RtlforgeError, Task, VerificationReport,
};
pub use engine::{
    EngineConfig, EngineState, RefinementEngine, RefinementOutcome, RepairResolution, Termination,
};
pub use extract::{
    extract, extract_interface_name, structure_defect, validate_structure, StructureDefect,
};
pub use generation::{GenerationError, Generator};
pub use ports::{analyze as analyze_ports, PortReport, PortStatus};
pub use prompt::{PromptBuilder, PromptKind};
pub use report::{
    read_run_report, write_run_report, IterationRecord, IterationResult, RefinementLog,
};
pub use verifier::Verifier;
pub use workspace::{find_target_file, gather_context, read_task};
