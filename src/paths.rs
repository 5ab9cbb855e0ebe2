//! Search-path resolution and library lookup.

use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Tokens the dynamic linker expands to the loading object's directory.
const ORIGIN_TOKENS: [&str; 2] = ["${ORIGIN}", "$ORIGIN"];

/// Turn raw RPATH/RUNPATH entries into the ordered directories to search.
///
/// Entries that are empty after trimming are dropped, colon-joined entries
/// are split, and every origin token is replaced with `origin` by plain
/// substitution (no normalization, so `$ORIGIN/../lib` stays
/// `/app/bin/../lib`). When nothing is left, the executable's own directory
/// is searched, so co-located libraries are still found.
///
/// `origin` is spliced in as an `OsStr`, so non-UTF-8 directories are kept
/// byte for byte.
///
/// The result is never empty.
#[must_use]
pub fn resolve_search_paths(raw: &[String], origin: &Path) -> Vec<PathBuf> {
    let resolved: Vec<PathBuf> = raw
        .iter()
        .flat_map(|entry| entry.split(':'))
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| substitute_origin(entry, origin.as_os_str()))
        .collect();

    if resolved.is_empty() {
        vec![origin.to_path_buf()]
    } else {
        resolved
    }
}

/// Replace every origin token in `entry`, left to right.
fn substitute_origin(entry: &str, origin: &OsStr) -> PathBuf {
    let mut out = OsString::new();
    let mut rest = entry;

    while let Some((idx, token)) = ORIGIN_TOKENS
        .iter()
        .filter_map(|token| rest.find(token).map(|idx| (idx, *token)))
        .min_by_key(|(idx, _)| *idx)
    {
        out.push(&rest[..idx]);
        out.push(origin);
        rest = &rest[idx + token.len()..];
    }
    out.push(rest);

    PathBuf::from(out)
}

/// Find a library in the resolved search paths.
///
/// Directories are probed in order and the first `dir/lib_name` that exists
/// wins. Any kind of filesystem entry counts as a match.
///
/// Returns `None` if the library is not found in any search path.
#[must_use = "found library path should be used"]
pub fn find_library(lib_name: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
    search_paths
        .iter()
        .map(|dir| dir.join(lib_name))
        .find(|candidate| {
            let found = candidate.exists();
            tracing::trace!(candidate = %candidate.display(), found, "probe");
            found
        })
}

/// Directory containing the executable, made absolute against the current
/// directory. Symlinks are not resolved.
pub fn executable_origin(binary_path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(binary_path)
        .with_context(|| format!("Failed to make path absolute: {}", binary_path.display()))?;
    let origin = absolute
        .parent()
        .with_context(|| format!("Executable path has no parent: {}", absolute.display()))?;
    Ok(origin.to_path_buf())
}
