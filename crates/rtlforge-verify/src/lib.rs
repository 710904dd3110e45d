//! rtlforge verification pipeline
//!
//! Compile/lint gate (Verilator, falling back to Icarus) followed by an
//! optional cocotb functional test, exposed as a core [`Verifier`].
//!
//! [`Verifier`]: rtlforge_core::Verifier

pub mod error;
pub mod harness;
pub mod lint;
pub mod pipeline;
pub mod runner;
pub mod stage;

pub use error::{Result, VerifyError};
pub use harness::{failure_excerpt, find_rtl_files, FunctionalTester, HarnessConfig};
pub use lint::LintRunner;
pub use pipeline::VerificationPipeline;
pub use runner::{ToolInvocation, ToolOutput, ToolRunner};
pub use stage::LintTool;
