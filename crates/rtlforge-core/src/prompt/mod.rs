//! Prompt assembly for initial generation, error refinement and port repair.
//!
//! Templates are plain data with `{slot}` placeholders; rendering is a single
//! left-to-right substitution pass, so braces inside substituted values (HDL
//! concatenations, for one) are never re-expanded.

pub mod context;
pub mod patterns;
pub mod templates;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{ContextSet, ErrorCategory, Task};
pub use context::{format_context, ContextBudget};

/// Named template slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    SystemPrompt,
    TaskDescription,
    ContextFiles,
    FewShotExamples,
    Iteration,
    PreviousCode,
    ErrorMessages,
    ErrorCategory,
    CurrentCode,
    UnusedInputs,
    UnusedOutputs,
}

impl Slot {
    const ALL: [Slot; 11] = [
        Slot::SystemPrompt,
        Slot::TaskDescription,
        Slot::ContextFiles,
        Slot::FewShotExamples,
        Slot::Iteration,
        Slot::PreviousCode,
        Slot::ErrorMessages,
        Slot::ErrorCategory,
        Slot::CurrentCode,
        Slot::UnusedInputs,
        Slot::UnusedOutputs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Slot::SystemPrompt => "system_prompt",
            Slot::TaskDescription => "task_description",
            Slot::ContextFiles => "context_files",
            Slot::FewShotExamples => "few_shot_examples",
            Slot::Iteration => "iteration",
            Slot::PreviousCode => "previous_code",
            Slot::ErrorMessages => "error_messages",
            Slot::ErrorCategory => "error_category",
            Slot::CurrentCode => "current_code",
            Slot::UnusedInputs => "unused_inputs",
            Slot::UnusedOutputs => "unused_outputs",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.name() == name)
    }
}

/// Substitute `{slot}` placeholders in one pass. Unknown or unfilled
/// placeholders are left verbatim.
pub fn render(template: &str, values: &[(Slot, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let filled = after.find('}').and_then(|close| {
            let slot = Slot::from_name(&after[..close])?;
            let value = values.iter().find(|(s, _)| *s == slot)?.1;
            Some((value, close))
        });
        match filled {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Which template produced a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Initial,
    Refinement,
    PortRepair,
}

/// Builds the three prompt kinds from fixed templates.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    use_few_shot: bool,
    budget: ContextBudget,
}

impl PromptBuilder {
    /// `max_length_tokens` is the generation model's configured length budget.
    pub fn new(use_few_shot: bool, max_context_files: usize, max_length_tokens: u32) -> Self {
        let budget = ContextBudget::new(max_length_tokens, max_context_files);
        info!(
            few_shot = use_few_shot,
            max_files = max_context_files,
            input_tokens = budget.input_tokens,
            input_chars = budget.max_prompt_chars,
            "Initialized prompt builder"
        );
        Self {
            use_few_shot,
            budget,
        }
    }

    pub fn initial(&self, task: &Task, context: &ContextSet) -> String {
        let context_files = format_context(context, &self.budget);
        let examples = if self.use_few_shot {
            patterns::render(task.description())
        } else {
            String::new()
        };

        let prompt = render(
            templates::INITIAL_GENERATION,
            &[
                (Slot::SystemPrompt, templates::SYSTEM_PROMPT),
                (Slot::TaskDescription, task.description()),
                (Slot::ContextFiles, &context_files),
                (Slot::FewShotExamples, &examples),
            ],
        );
        info!(chars = prompt.len(), "Built initial prompt");
        prompt
    }

    /// `previous_iteration` labels the iteration that produced `previous_code`.
    pub fn refinement(
        &self,
        task: &Task,
        previous_code: &str,
        errors: &str,
        category: ErrorCategory,
        previous_iteration: u32,
    ) -> String {
        let iteration = previous_iteration.to_string();
        let prompt = render(
            templates::ERROR_REFINEMENT,
            &[
                (Slot::SystemPrompt, templates::SYSTEM_PROMPT),
                (Slot::TaskDescription, task.description()),
                (Slot::Iteration, &iteration),
                (Slot::PreviousCode, previous_code),
                (Slot::ErrorMessages, errors),
                (Slot::ErrorCategory, category.as_str()),
            ],
        );
        info!(chars = prompt.len(), category = %category, "Built refinement prompt");
        prompt
    }

    pub fn port_repair(
        &self,
        current_code: &str,
        unused_inputs: &[String],
        unassigned_outputs: &[String],
    ) -> String {
        let inputs = join_or_none(unused_inputs);
        let outputs = join_or_none(unassigned_outputs);
        let prompt = render(
            templates::PORT_REPAIR,
            &[
                (Slot::SystemPrompt, templates::SYSTEM_PROMPT),
                (Slot::CurrentCode, current_code),
                (Slot::UnusedInputs, &inputs),
                (Slot::UnusedOutputs, &outputs),
            ],
        );
        info!(
            chars = prompt.len(),
            unused_inputs = %inputs,
            unused_outputs = %outputs,
            "Built port usage prompt"
        );
        prompt
    }
}

fn join_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "None".to_string()
    } else {
        names.join(", ")
    }
}
