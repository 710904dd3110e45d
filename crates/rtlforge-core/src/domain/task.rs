//! Task and context inputs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Immutable natural-language requirement for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    description: String,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_empty(&self) -> bool {
        self.description.trim().is_empty()
    }
}

/// Priority class of a context file, decided by its top-level directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextClass {
    Documentation,
    Interface,
    Verification,
}

impl ContextClass {
    /// Classes in prompt priority order.
    pub const ORDERED: [ContextClass; 3] = [
        ContextClass::Documentation,
        ContextClass::Interface,
        ContextClass::Verification,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            ContextClass::Documentation => "docs/",
            ContextClass::Interface => "rtl/",
            ContextClass::Verification => "verif/",
        }
    }

    /// Class of a relative path, or `None` for files that never reach a prompt.
    pub fn of(path: &str) -> Option<Self> {
        Self::ORDERED
            .into_iter()
            .find(|class| path.starts_with(class.prefix()))
    }
}

/// A single context file as handed to the prompt assembler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFile {
    pub path: String,
    pub content: String,
}

/// Read-only mapping of relative path to file content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSet {
    files: BTreeMap<String, String>,
}

impl ContextSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Files in priority order (docs, then RTL, then verification), paths
    /// sorted within each class, capped at `max_files`. Files outside the
    /// three classes are never selected.
    pub fn prioritized(&self, max_files: usize) -> Vec<ContextFile> {
        let mut ranked: Vec<_> = self
            .files
            .iter()
            .filter_map(|(path, content)| ContextClass::of(path).map(|class| (class, path, content)))
            .collect();
        // Stable: paths stay sorted within a class.
        ranked.sort_by_key(|(class, _, _)| *class);
        ranked
            .into_iter()
            .take(max_files)
            .map(|(_, path, content)| ContextFile {
                path: path.clone(),
                content: content.clone(),
            })
            .collect()
    }
}

impl FromIterator<(String, String)> for ContextSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}
