//! Context-file budgeting for prompts.

use tracing::info;

use crate::domain::ContextSet;

/// Share of the model's length budget reserved for the prompt itself.
const INPUT_FRACTION: f64 = 0.75;

/// Rough characters-per-token ratio for English and HDL text.
const CHARS_PER_TOKEN: usize = 4;

const TRUNCATION_NOTICE: &str = "\n... (truncated)";

/// Character budget for the context section of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    /// Input tokens available after reserving the output share.
    pub input_tokens: usize,

    /// `input_tokens` converted to characters.
    pub max_prompt_chars: usize,

    pub max_files: usize,
}

impl ContextBudget {
    pub fn new(max_length_tokens: u32, max_files: usize) -> Self {
        let input_tokens = (max_length_tokens as f64 * INPUT_FRACTION) as usize;
        Self {
            input_tokens,
            max_prompt_chars: input_tokens * CHARS_PER_TOKEN,
            max_files,
        }
    }

    pub fn chars_per_file(&self) -> usize {
        self.max_prompt_chars / self.max_files.max(1)
    }
}

/// Render the prioritized, truncated context section.
pub fn format_context(context: &ContextSet, budget: &ContextBudget) -> String {
    let per_file = budget.chars_per_file();
    let sections: Vec<String> = context
        .prioritized(budget.max_files)
        .into_iter()
        .map(|file| {
            format!(
                "\nFILE: {}\n```\n{}\n```",
                file.path,
                truncate(&file.content, per_file)
            )
        })
        .collect();

    if sections.is_empty() {
        return "No context files available".to_string();
    }

    info!(
        files = sections.len(),
        total_chars = sections.iter().map(String::len).sum::<usize>(),
        per_file_budget = per_file,
        "Formatted context files"
    );
    sections.join("\n")
}

fn truncate(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &content[..cut], TRUNCATION_NOTICE),
        None => content.to_string(),
    }
}
