//! Domain models for rtlforge.
//!
//! Canonical definitions for the entities the refinement engine moves around:
//! - `Task`: the natural-language requirement, read once per run
//! - `ContextFile` / `ContextSet`: read-only reference material for prompts
//! - `ErrorCategory`: coarse taxonomy over raw tool diagnostics
//! - `VerificationReport`: result of the compile gate and functional test

pub mod category;
pub mod error;
pub mod task;
pub mod verification;

pub use category::ErrorCategory;
pub use error::{ConfigError, Result, RtlforgeError};
pub use task::{ContextClass, ContextFile, ContextSet, Task};
pub use verification::{FunctionalOutcome, GateOutcome, VerificationReport};
