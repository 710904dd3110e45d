//! Response extraction and structural smoke tests.
//!
//! Turns raw model output into a candidate HDL module. Everything here is
//! heuristic text inspection: the patterns below are the contract, not a
//! grammar.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

/// A declaration head at line start: `module <name>` followed by `(` or `#`.
static DECLARATION_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*module\s+\w+\s*[(#]").expect("DECLARATION_ANCHOR regex should compile")
});

static HDL_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:verilog|systemverilog|sv)\s*\n(.*?)\n```")
        .expect("HDL_FENCE regex should compile")
});

static GENERIC_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```\s*\n(.*?)\n```").expect("GENERIC_FENCE regex should compile")
});

static DECLARATION_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ims)^\s*module\s+\w+\s*[(#].*?endmodule\s*$")
        .expect("DECLARATION_SPAN regex should compile")
});

static INTERFACE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmodule\s+(\w+)").expect("INTERFACE_NAME regex should compile")
});

/// Drop reasoning text ahead of the first declaration head. Without an
/// anchor the response is returned untouched.
pub fn strip_preamble(response: &str) -> &str {
    match DECLARATION_ANCHOR.find(response) {
        Some(anchor) => &response[anchor.start()..],
        None => response,
    }
}

/// Extract HDL code from a raw model response. Never fails; the fallback is
/// the trimmed (preamble-stripped) response.
pub fn extract(response: &str) -> String {
    if response.is_empty() {
        warn!("Empty response received");
        return String::new();
    }

    let response = strip_preamble(response);

    for fence in [&*HDL_FENCE, &*GENERIC_FENCE] {
        if let Some(block) = fence.captures(response).and_then(|c| c.get(1)) {
            let code = block.as_str().trim().to_string();
            info!(bytes = code.len(), "Extracted from markdown block");
            return code;
        }
    }

    if response.to_lowercase().contains("module ") {
        if let Some(span) = DECLARATION_SPAN.find(response) {
            let code = span.as_str().trim().to_string();
            info!(bytes = code.len(), "Extracted module definition");
            return code;
        }
    }

    debug!(bytes = response.len(), "Using raw response");
    response.trim().to_string()
}

/// Gross structural defect found by [`structure_defect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureDefect {
    Empty,
    MissingModule,
    MissingEndmodule,
    UnbalancedParentheses { open: usize, close: usize },
}

impl std::fmt::Display for StructureDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructureDefect::Empty => write!(f, "no code was extracted from the response"),
            StructureDefect::MissingModule => write!(f, "missing 'module' keyword"),
            StructureDefect::MissingEndmodule => write!(f, "missing 'endmodule' keyword"),
            StructureDefect::UnbalancedParentheses { open, close } => write!(
                f,
                "unbalanced parentheses ({} open, {} close)",
                open, close
            ),
        }
    }
}

/// First structural defect in `code`, if any. Syntactically broken interiors
/// pass as long as the outline is intact.
pub fn structure_defect(code: &str) -> Option<StructureDefect> {
    if code.is_empty() {
        return Some(StructureDefect::Empty);
    }

    let lower = code.to_lowercase();
    if !lower.contains("module") {
        return Some(StructureDefect::MissingModule);
    }
    if !lower.contains("endmodule") {
        return Some(StructureDefect::MissingEndmodule);
    }

    let open = code.matches('(').count();
    let close = code.matches(')').count();
    if open != close {
        return Some(StructureDefect::UnbalancedParentheses { open, close });
    }

    None
}

pub fn validate_structure(code: &str) -> bool {
    match structure_defect(code) {
        Some(defect) => {
            warn!(%defect, "Basic structure validation failed");
            false
        }
        None => true,
    }
}

/// Name following the first `module` keyword. Diagnostics only.
pub fn extract_interface_name(code: &str) -> Option<String> {
    INTERFACE_NAME
        .captures(code)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
