use std::path::{Path, PathBuf};

use crate::config::CodeGraphConfig;
use crate::parser::languages::SOURCE_EXTENSIONS;

/// Walk a project directory and collect source files, as paths relative to `root`.
///
/// Respects `.gitignore` rules, always excludes `node_modules`, and applies
/// any additional exclusions from `config.exclude`. The result is sorted.
pub fn walk_project(root: &Path, config: &CodeGraphConfig) -> Vec<PathBuf> {
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(true)
        // Read .gitignore files even when the directory is not inside a git repository.
        // This ensures exclusions work for standalone directories and testing scenarios.
        .require_git(false)
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                log::warn!("{err}");
                continue;
            }
        };

        // Skip directories (we only want files).
        if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };

        // No component of the path may be `node_modules`.
        if path_contains_node_modules(relative) {
            continue;
        }

        // Apply additional config exclusions.
        if is_excluded_by_config(relative, config) {
            continue;
        }

        // Filter by source extension.
        let ext = relative.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !SOURCE_EXTENSIONS.contains(&ext) {
            continue;
        }

        log::debug!("found {}", relative.display());
        files.push(relative.to_path_buf());
    }

    files.sort();
    files
}

/// Returns true if any component of `path` is named `node_modules`.
fn path_contains_node_modules(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| s == "node_modules")
            .unwrap_or(false)
    })
}

/// Returns true if `path` matches any exclusion pattern from config.
fn is_excluded_by_config(path: &Path, config: &CodeGraphConfig) -> bool {
    let patterns = match &config.exclude {
        Some(p) => p,
        None => return false,
    };

    let path_str = path.to_string_lossy();

    for pattern in patterns {
        let Ok(matcher) = glob::Pattern::new(pattern) else {
            log::warn!("ignoring invalid exclude pattern '{pattern}'");
            continue;
        };
        if matcher.matches(&path_str) {
            return true;
        }
        // Also check if any component matches the pattern directly.
        for component in path.components() {
            if let Some(s) = component.as_os_str().to_str()
                && matcher.matches(s)
            {
                return true;
            }
        }
    }

    false
}
