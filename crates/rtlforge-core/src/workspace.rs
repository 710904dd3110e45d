//! Filesystem side of a run: task record, context tree, target file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::domain::{ContextSet, Result, RtlforgeError, Task};

/// Directories scanned for context, relative to the code directory.
pub const CONTEXT_DIRS: [&str; 4] = ["docs", "rtl", "verif", "rundir"];

/// Names tried, in order, when the RTL directory has no empty file.
pub const COMMON_TARGET_NAMES: [&str; 6] = [
    "top.sv",
    "top.v",
    "top_module.sv",
    "top_module.v",
    "design.sv",
    "design.v",
];

#[derive(Debug, Deserialize)]
struct TaskRecord {
    #[serde(default)]
    prompt: String,
}

/// Read the task from a `{"prompt": "..."}` record. A record without a
/// `prompt` field yields an empty task.
pub fn read_task(prompt_file: &Path) -> Result<Task> {
    let bytes = std::fs::read(prompt_file)?;
    let record: TaskRecord =
        serde_json::from_slice(&bytes).map_err(|e| RtlforgeError::InvalidTask {
            path: prompt_file.display().to_string(),
            reason: e.to_string(),
        })?;

    let preview: String = record.prompt.chars().take(150).collect();
    info!(path = %prompt_file.display(), preview = %preview, "Read task");
    Ok(Task::new(record.prompt))
}

/// Load every readable file under the context directories, keyed by path
/// relative to `base_dir` with `/` separators.
pub fn gather_context(base_dir: &Path) -> ContextSet {
    let mut context = ContextSet::new();

    for dir_name in CONTEXT_DIRS {
        let dir = base_dir.join(dir_name);
        if !dir.is_dir() {
            info!(dir = dir_name, "Context directory not found");
            continue;
        }

        for entry in WalkDir::new(&dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative) = relative_key(base_dir, path) else {
                continue;
            };
            match std::fs::read(path) {
                Ok(bytes) => {
                    let content = String::from_utf8_lossy(&bytes).into_owned();
                    info!(path = %relative, bytes = content.len(), "Loaded context file");
                    context.insert(relative, content);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Could not read context file"),
            }
        }
    }

    info!(files = context.len(), "Gathered context");
    context
}

fn relative_key(base_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base_dir).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}

/// Choose the file the generated code is written to, creating `rtl_dir`
/// when absent.
///
/// Order: first empty file, first free common name, first `*.sv`, first
/// `*.v`, then `top.sv`.
pub fn find_target_file(rtl_dir: &Path) -> Result<PathBuf> {
    if !rtl_dir.exists() {
        warn!(dir = %rtl_dir.display(), "RTL directory not found, creating it");
        std::fs::create_dir_all(rtl_dir)?;
    }

    let mut files: Vec<(PathBuf, u64)> = Vec::new();
    for entry in std::fs::read_dir(rtl_dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_file() {
            files.push((entry.path(), meta.len()));
        }
    }
    files.sort();

    if let Some((path, _)) = files.iter().find(|(_, len)| *len == 0) {
        info!(path = %path.display(), "Found empty target file");
        return Ok(path.clone());
    }

    if let Some(path) = COMMON_TARGET_NAMES
        .iter()
        .map(|name| rtl_dir.join(name))
        .find(|path| !path.exists())
    {
        info!(path = %path.display(), "Will create target file");
        return Ok(path);
    }

    for ext in ["sv", "v"] {
        if let Some((path, _)) = files
            .iter()
            .find(|(path, _)| path.extension().is_some_and(|e| e == ext))
        {
            info!(path = %path.display(), "Using existing file");
            return Ok(path.clone());
        }
    }

    Ok(rtl_dir.join("top.sv"))
}
