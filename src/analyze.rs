//! ELF binary introspection using readelf.

use std::path::Path;
use std::process::Command;

use crate::error::IntrospectError;

/// Source of the two dynamic-section facts the resolver needs.
///
/// Implementations must fail loudly: a binary that cannot be inspected is an
/// error, never an empty list. An ELF file without a dynamic section is not an
/// error and yields empty lists.
pub trait ElfIntrospector {
    /// `DT_NEEDED` library names, in declaration order.
    fn needed_libraries(&self, binary_path: &Path) -> Result<Vec<String>, IntrospectError>;

    /// `DT_RPATH`/`DT_RUNPATH` entries, split on `:`, in declaration order.
    /// `$ORIGIN` is left unsubstituted.
    fn search_paths(&self, binary_path: &Path) -> Result<Vec<String>, IntrospectError>;
}

/// Needed libraries and raw search paths read from a dynamic section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicEntries {
    pub needed: Vec<String>,
    pub search_paths: Vec<String>,
}

/// Introspector backed by `readelf -d`.
///
/// This is architecture-independent - readelf reads the ELF headers directly
/// without executing the binary, unlike ldd which uses the host dynamic linker.
#[derive(Debug, Clone)]
pub struct Readelf {
    program: String,
}

impl Readelf {
    /// Use a specific readelf executable (e.g. a cross `aarch64-linux-gnu-readelf`).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run `readelf -d` and parse its dynamic section listing.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `readelf` is not installed (install binutils)
    /// - `readelf` exits non-zero, which covers missing files and non-ELF input
    pub fn dynamic_entries(&self, binary_path: &Path) -> Result<DynamicEntries, IntrospectError> {
        let command = format!("{} -d {}", self.program, binary_path.display());
        tracing::debug!(%command, "running readelf");

        // The labels parsed below are translated under other locales.
        let output = Command::new(&self.program)
            .arg("-d")
            .arg(binary_path)
            .env("LC_ALL", "C")
            .output()
            .map_err(|source| IntrospectError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(IntrospectError::Failed {
                command,
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_readelf_output(&stdout))
    }
}

impl Default for Readelf {
    fn default() -> Self {
        Self::with_program("readelf")
    }
}

impl ElfIntrospector for Readelf {
    fn needed_libraries(&self, binary_path: &Path) -> Result<Vec<String>, IntrospectError> {
        Ok(self.dynamic_entries(binary_path)?.needed)
    }

    fn search_paths(&self, binary_path: &Path) -> Result<Vec<String>, IntrospectError> {
        Ok(self.dynamic_entries(binary_path)?.search_paths)
    }
}

/// Parse readelf -d output to extract NEEDED names and RPATH/RUNPATH entries.
///
/// Example readelf output:
/// ```text
/// Dynamic section at offset 0x2d0e0 contains 28 entries:
///   Tag        Type                         Name/Value
///  0x0000000000000001 (NEEDED)             Shared library: [libtinfo.so.6]
///  0x0000000000000001 (NEEDED)             Shared library: [libc.so.6]
///  0x000000000000001d (RUNPATH)            Library runpath: [$ORIGIN/../lib:/opt/lib]
/// ```
///
/// Output without a dynamic section ("There is no dynamic section in this
/// file.") parses to empty lists.
#[must_use]
pub fn parse_readelf_output(output: &str) -> DynamicEntries {
    let mut entries = DynamicEntries::default();

    for line in output.lines() {
        if line.contains("(NEEDED)") && line.contains("Shared library:") {
            if let Some(lib_name) = bracketed(line) {
                entries.needed.push(lib_name.to_string());
            }
        } else if (line.contains("(RPATH)") && line.contains("Library rpath:"))
            || (line.contains("(RUNPATH)") && line.contains("Library runpath:"))
        {
            if let Some(value) = bracketed(line) {
                entries
                    .search_paths
                    .extend(value.split(':').map(str::to_string));
            }
        }
    }

    entries
}

/// Text between the first `[` and the last `]`.
///
/// Search paths may legitimately contain brackets, so the closing one is
/// taken from the end of the line.
fn bracketed(line: &str) -> Option<&str> {
    let start = line.find('[')?;
    let end = line.rfind(']')?;
    (end > start).then(|| &line[start + 1..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_parse_readelf_output() {
        let output = r#"
Dynamic section at offset 0x2d0e0 contains 28 entries:
  Tag        Type                         Name/Value
 0x0000000000000001 (NEEDED)             Shared library: [libtinfo.so.6]
 0x0000000000000001 (NEEDED)             Shared library: [libc.so.6]
 0x000000000000000c (INIT)               0x5000
"#;
        let entries = parse_readelf_output(output);
        assert_eq!(entries.needed, vec!["libtinfo.so.6", "libc.so.6"]);
        assert!(entries.search_paths.is_empty());
    }

    #[test]
    fn test_parse_readelf_runpath_is_split() {
        let output = r#"
 0x0000000000000001 (NEEDED)             Shared library: [libbar.so]
 0x000000000000001d (RUNPATH)            Library runpath: [$ORIGIN/../lib:/opt/app/lib]
"#;
        let entries = parse_readelf_output(output);
        assert_eq!(entries.needed, vec!["libbar.so"]);
        assert_eq!(entries.search_paths, vec!["$ORIGIN/../lib", "/opt/app/lib"]);
    }

    #[test]
    fn test_parse_readelf_rpath_keeps_empty_pieces_and_order() {
        let output = r#"
 0x000000000000000f (RPATH)              Library rpath: [/first::/second]
 0x000000000000001d (RUNPATH)            Library runpath: [/third]
"#;
        let entries = parse_readelf_output(output);
        assert_eq!(entries.search_paths, vec!["/first", "", "/second", "/third"]);
    }

    #[test]
    fn test_parse_readelf_no_dynamic_section() {
        let entries = parse_readelf_output("\nThere is no dynamic section in this file.\n");
        assert_eq!(entries, DynamicEntries::default());
    }

    /// Stand-in readelf that prints its NEEDED line in English only under
    /// the C locale, like a translated binutils would.
    fn create_locale_sensitive_readelf(dir: &Path) -> PathBuf {
        let script = dir.join("readelf");
        fs::write(
            &script,
            r#"#!/bin/sh
if [ "$LC_ALL" = "C" ]; then
  echo ' 0x0000000000000001 (NEEDED)             Shared library: [libc.so.6]'
  echo ' 0x000000000000001d (RUNPATH)            Library runpath: [$ORIGIN/../lib]'
else
  echo ' 0x0000000000000001 (NEEDED)             Gemeinsame Bibliothek: [libc.so.6]'
  echo ' 0x000000000000001d (RUNPATH)            Bibliothek runpath: [$ORIGIN/../lib]'
fi
"#,
        )
        .unwrap();
        let mut perms = fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script, perms).unwrap();
        script
    }

    #[test]
    fn test_readelf_runs_under_c_locale() {
        let temp = TempDir::new().unwrap();
        let stub = create_locale_sensitive_readelf(temp.path());
        let readelf = Readelf::with_program(stub.to_string_lossy());

        let entries = readelf.dynamic_entries(Path::new("/app/bin/prog")).unwrap();
        assert_eq!(entries.needed, vec!["libc.so.6"]);
        assert_eq!(entries.search_paths, vec!["$ORIGIN/../lib"]);
    }

    #[test]
    fn test_missing_readelf_program_is_spawn_error() {
        let readelf = Readelf::with_program("readelf-that-does-not-exist");
        let err = readelf
            .needed_libraries(Path::new("/bin/sh"))
            .unwrap_err();
        assert!(matches!(err, IntrospectError::Spawn { .. }), "got: {err:?}");
        assert_eq!(err.exit_code(), 127);
    }
}
