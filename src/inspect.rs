//! In-process ELF introspection with goblin.

use goblin::elf::dynamic::{DT_NEEDED, DT_RPATH, DT_RUNPATH};
use goblin::elf::Elf;
use std::fs;
use std::path::Path;

use crate::analyze::{DynamicEntries, ElfIntrospector};
use crate::error::IntrospectError;

/// Introspector that parses the dynamic section directly, without needing
/// binutils on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct Goblin;

impl Goblin {
    /// Read the file and collect `DT_NEEDED`, `DT_RPATH` and `DT_RUNPATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid ELF file.
    pub fn dynamic_entries(&self, binary_path: &Path) -> Result<DynamicEntries, IntrospectError> {
        let bytes = fs::read(binary_path).map_err(|source| IntrospectError::Read {
            path: binary_path.to_path_buf(),
            source,
        })?;
        let elf = Elf::parse(&bytes).map_err(|source| IntrospectError::Parse {
            path: binary_path.to_path_buf(),
            source,
        })?;

        let mut entries = DynamicEntries::default();
        let Some(dynamic) = &elf.dynamic else {
            return Ok(entries);
        };

        for dyn_entry in &dynamic.dyns {
            let Ok(strtab_idx) = usize::try_from(dyn_entry.d_val) else {
                continue;
            };
            match dyn_entry.d_tag {
                DT_NEEDED => {
                    if let Some(name) = elf.dynstrtab.get_at(strtab_idx) {
                        entries.needed.push(name.to_string());
                    }
                }
                DT_RPATH | DT_RUNPATH => {
                    if let Some(value) = elf.dynstrtab.get_at(strtab_idx) {
                        entries
                            .search_paths
                            .extend(value.split(':').map(str::to_string));
                    }
                }
                _ => {}
            }
        }

        Ok(entries)
    }
}

impl ElfIntrospector for Goblin {
    fn needed_libraries(&self, binary_path: &Path) -> Result<Vec<String>, IntrospectError> {
        Ok(self.dynamic_entries(binary_path)?.needed)
    }

    fn search_paths(&self, binary_path: &Path) -> Result<Vec<String>, IntrospectError> {
        Ok(self.dynamic_entries(binary_path)?.search_paths)
    }
}
