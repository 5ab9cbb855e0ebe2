//! Resolve every needed library of an executable to a path on disk.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::analyze::ElfIntrospector;
use crate::paths::{executable_origin, find_library, resolve_search_paths};

/// Outcome of looking up one needed library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved { name: String, path: PathBuf },
    Unresolved { name: String, searched: Vec<PathBuf> },
}

impl Resolution {
    pub fn name(&self) -> &str {
        match self {
            Self::Resolved { name, .. } | Self::Unresolved { name, .. } => name,
        }
    }
}

/// Result of one resolution pass over an executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyReport {
    pub executable: PathBuf,
    /// Directories that were searched, after `$ORIGIN` substitution.
    pub search_paths: Vec<PathBuf>,
    /// One entry per needed library, in declaration order.
    pub resolutions: Vec<Resolution>,
}

impl DependencyReport {
    pub fn resolved(&self) -> impl Iterator<Item = &Path> {
        self.resolutions.iter().filter_map(|r| match r {
            Resolution::Resolved { path, .. } => Some(path.as_path()),
            Resolution::Unresolved { .. } => None,
        })
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &Resolution> {
        self.resolutions
            .iter()
            .filter(|r| matches!(r, Resolution::Unresolved { .. }))
    }
}

/// Resolve the direct dependencies of `binary_path`.
///
/// Libraries that cannot be found are reported as [`Resolution::Unresolved`]
/// and do not stop the pass. Dependencies of the found libraries are not
/// followed.
///
/// # Errors
///
/// Returns an error only if the introspector fails; the underlying
/// [`IntrospectError`](crate::IntrospectError) stays reachable through
/// `downcast_ref`.
pub fn resolve_dependencies(
    introspector: &dyn ElfIntrospector,
    binary_path: &Path,
) -> Result<DependencyReport> {
    let origin = executable_origin(binary_path)?;

    let raw_search_paths = introspector
        .search_paths(binary_path)
        .with_context(|| format!("Failed to read search paths of {}", binary_path.display()))?;
    let needed = introspector
        .needed_libraries(binary_path)
        .with_context(|| format!("Failed to read needed libraries of {}", binary_path.display()))?;

    let search_paths = resolve_search_paths(&raw_search_paths, &origin);
    tracing::debug!(?raw_search_paths, ?search_paths, "resolved search paths");

    let resolutions = needed
        .into_iter()
        .map(|name| match find_library(&name, &search_paths) {
            Some(path) => {
                tracing::debug!(library = %name, path = %path.display(), "resolved");
                Resolution::Resolved { name, path }
            }
            None => {
                tracing::debug!(library = %name, "not found");
                Resolution::Unresolved {
                    name,
                    searched: search_paths.clone(),
                }
            }
        })
        .collect();

    Ok(DependencyReport {
        executable: binary_path.to_path_buf(),
        search_paths,
        resolutions,
    })
}
