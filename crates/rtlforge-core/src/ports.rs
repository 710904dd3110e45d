//! Port-completeness analysis.
//!
//! Approximate static check over a module's declared interface: every input
//! should be read and every output assigned somewhere in the module body.
//! Detection is pattern based. The accepted shapes are pinned by the tests
//! below; anything outside them is simply not seen.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Words the declaration patterns can capture that are never port names.
const STOP_WORDS: &[&str] = &[
    "input", "output", "logic", "wire", "reg", "signed", "unsigned",
];

static INPUT_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"input\s+(?:logic|wire|reg)?\s*(?:\[[^\]]+\])?\s+(\w+)")
            .expect("typed input regex should compile"),
        Regex::new(r"input\s+(\w+)").expect("bare input regex should compile"),
    ]
});

static OUTPUT_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"output\s+(?:logic|wire|reg)?\s*(?:\[[^\]]+\])?\s+(\w+)")
            .expect("typed output regex should compile"),
        Regex::new(r"output\s+(\w+)").expect("bare output regex should compile"),
    ]
});

/// Usage status of a single declared port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortStatus {
    Used,
    Unused,
    Assigned,
    Unassigned,
}

/// Result of one analysis. Recomputed from scratch for every artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortReport {
    /// Declared inputs never referenced in the body, sorted.
    pub unused_inputs: Vec<String>,

    /// Declared outputs never assigned in the body, sorted.
    pub unassigned_outputs: Vec<String>,

    pub port_status: BTreeMap<String, PortStatus>,

    pub feedback: String,
}

impl PortReport {
    pub fn all_ports_used(&self) -> bool {
        self.unused_inputs.is_empty() && self.unassigned_outputs.is_empty()
    }
}

/// Analyze `code` for unused inputs and unassigned outputs.
pub fn analyze(code: &str) -> PortReport {
    let inputs = declared_ports(&INPUT_PATTERNS[..], code);
    let outputs = declared_ports(&OUTPUT_PATTERNS[..], code);

    info!(
        inputs = inputs.len(),
        outputs = outputs.len(),
        "Analyzing port usage"
    );

    if inputs.is_empty() && outputs.is_empty() {
        warn!("No ports found in code");
        return PortReport {
            unused_inputs: Vec::new(),
            unassigned_outputs: Vec::new(),
            port_status: BTreeMap::new(),
            feedback: "No ports found in module".to_string(),
        };
    }

    let body = module_body(code);
    let mut port_status = BTreeMap::new();
    let mut unused_inputs = Vec::new();
    let mut unassigned_outputs = Vec::new();

    for input in inputs {
        if is_referenced(&input, body) {
            port_status.insert(input, PortStatus::Used);
        } else {
            port_status.insert(input.clone(), PortStatus::Unused);
            unused_inputs.push(input);
        }
    }

    for output in outputs {
        if is_assigned(&output, body) {
            port_status.insert(output, PortStatus::Assigned);
        } else {
            port_status.insert(output.clone(), PortStatus::Unassigned);
            unassigned_outputs.push(output);
        }
    }

    if unused_inputs.is_empty() && unassigned_outputs.is_empty() {
        info!("All ports properly used");
    } else {
        warn!(
            unused_inputs = ?unused_inputs,
            unassigned_outputs = ?unassigned_outputs,
            "Some ports are not used"
        );
    }

    let feedback = feedback(&unused_inputs, &unassigned_outputs);
    PortReport {
        unused_inputs,
        unassigned_outputs,
        port_status,
        feedback,
    }
}

/// Deduplicated, stop-word-filtered, sorted identifiers captured by `patterns`.
fn declared_ports(patterns: &[Regex], code: &str) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|re| re.captures_iter(code))
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .filter(|name| !STOP_WORDS.contains(name))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Text after the port list: after the first `);`, else after the first `;`,
/// else the whole code.
fn module_body(code: &str) -> &str {
    if let Some(idx) = code.find(");") {
        return &code[idx + 2..];
    }
    if let Some(idx) = code.find(';') {
        return &code[idx + 1..];
    }
    code
}

fn is_referenced(port: &str, body: &str) -> bool {
    let pattern = format!(r"\b{}\b", regex::escape(port));
    Regex::new(&pattern)
        .map(|re| re.is_match(body))
        .unwrap_or(false)
}

/// Non-blocking, blocking, or continuous assignment to `port`.
fn is_assigned(port: &str, body: &str) -> bool {
    let name = regex::escape(port);
    [
        format!(r"\b{}\s*<=", name),
        // `=` not followed by another `=`, so `y == 1` is not an assignment.
        format!(r"\b{}\s*=(?:[^=]|$)", name),
        format!(r"assign\s+{}\b", name),
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .any(|re| re.is_match(body))
}

fn feedback(unused_inputs: &[String], unassigned_outputs: &[String]) -> String {
    if unused_inputs.is_empty() && unassigned_outputs.is_empty() {
        return "All ports are properly used and assigned.".to_string();
    }

    let mut parts = Vec::new();
    if !unused_inputs.is_empty() {
        parts.push(format!(
            "UNUSED INPUT PORTS: {}\n   These input ports are declared but never referenced in the module logic.\n   Recommendation: Use these inputs in conditional logic, state machines, or computations.",
            unused_inputs.join(", ")
        ));
    }
    if !unassigned_outputs.is_empty() {
        parts.push(format!(
            "UNASSIGNED OUTPUT PORTS: {}\n   These output ports are declared but never assigned any value.\n   Recommendation: Add assignments (blocking, non-blocking, or continuous) for these outputs.",
            unassigned_outputs.join(", ")
        ));
    }
    parts.join("\n\n")
}
