//! Resolve the needed shared libraries of an ELF executable.
//!
//! Reads `DT_NEEDED` and `DT_RPATH`/`DT_RUNPATH` (via `readelf -d` or
//! in-process with goblin), expands `$ORIGIN` to the executable's directory
//! and finds the first existing match for each library. Only direct
//! dependencies are resolved; there is no `LD_LIBRARY_PATH`, ld.so.cache or
//! default system directory lookup.

mod analyze;
mod error;
mod inspect;
mod paths;
mod resolve;

pub use analyze::{parse_readelf_output, DynamicEntries, ElfIntrospector, Readelf};
pub use error::IntrospectError;
pub use inspect::Goblin;
pub use paths::{executable_origin, find_library, resolve_search_paths};
pub use resolve::{resolve_dependencies, DependencyReport, Resolution};
