//! Error taxonomy used to steer refinement prompts.

use serde::{Deserialize, Serialize};

/// Coarse category of a verification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Syntax,
    Undeclared,
    Type,
    Width,
    Latch,
    Timing,
    General,
}

/// Keyword sets in tie-break order. Text matching several sets resolves to
/// the earliest entry.
const KEYWORDS: &[(ErrorCategory, &[&str])] = &[
    (
        ErrorCategory::Syntax,
        &["syntax error", "parse error", "unexpected", "expected"],
    ),
    (
        ErrorCategory::Undeclared,
        &["undeclared", "undefined", "not declared"],
    ),
    (
        ErrorCategory::Type,
        &["type mismatch", "incompatible types"],
    ),
    (ErrorCategory::Width, &["width", "bit width", "size mismatch"]),
    (ErrorCategory::Latch, &["latch"]),
    (ErrorCategory::Timing, &["timing", "setup", "hold"]),
];

impl ErrorCategory {
    /// Classify raw error text.
    pub fn categorize(errors: &str) -> Self {
        let lower = errors.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
            .map(|(category, _)| *category)
            .unwrap_or(ErrorCategory::General)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Syntax => "syntax",
            ErrorCategory::Undeclared => "undeclared",
            ErrorCategory::Type => "type",
            ErrorCategory::Width => "width",
            ErrorCategory::Latch => "latch",
            ErrorCategory::Timing => "timing",
            ErrorCategory::General => "general",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
