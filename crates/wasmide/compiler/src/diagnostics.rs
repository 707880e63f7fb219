//! Normalization of toolchain output into user-facing diagnostics.

use std::path::Path;

/// How a backend reduces raw stderr to diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticFilter {
    /// Keep only lines that mention the seed file, falling back to the whole
    /// output when none do.
    SeedFileLines,
    /// Keep the whole output.
    Verbatim,
}

/// Replace every occurrence of the workspace directory with a relative path
/// so that diagnostics read as `main.go:3:2: ...`.
pub fn scrub_paths(text: &str, workspace: &Path) -> String {
    let mut roots = vec![workspace.display().to_string()];
    if let Ok(canonical) = workspace.canonicalize() {
        let canonical = canonical.display().to_string();
        if !roots.contains(&canonical) {
            roots.push(canonical);
        }
    }
    // Longest first so a canonical path that extends the plain one is not
    // left half-replaced.
    roots.sort_by_key(|r| std::cmp::Reverse(r.len()));

    let mut out = text.to_string();
    for root in roots.iter().filter(|r| !r.is_empty()) {
        out = out.replace(&format!("{root}/"), "");
        out = out.replace(root.as_str(), ".");
    }
    out
}

/// Lines of `output` that reference `seed_file`, or `None` if there are none.
pub fn seed_file_lines(output: &str, seed_file: &str) -> Option<String> {
    let lines: Vec<&str> = output
        .lines()
        .filter(|line| line.contains(seed_file))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Turn raw stderr into the diagnostic text shown to the user.
///
/// Returns `None` when the tool produced no output at all.
pub fn normalize(
    stderr: &str,
    workspace: &Path,
    seed_file: &str,
    filter: DiagnosticFilter,
) -> Option<String> {
    let scrubbed = scrub_paths(stderr, workspace);
    let trimmed = scrubbed.trim();
    if trimmed.is_empty() {
        return None;
    }
    let text = match filter {
        DiagnosticFilter::SeedFileLines => {
            seed_file_lines(trimmed, seed_file).unwrap_or_else(|| trimmed.to_string())
        }
        DiagnosticFilter::Verbatim => trimmed.to_string(),
    };
    Some(text)
}
