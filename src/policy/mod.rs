// Declarative category policies
//
// A policy pass names one hardware category, a component pattern, and three
// attribute lists (exclude, include, override). The fingerprint builder walks
// the table uniformly, so the set of compared hardware lives in TOML rather
// than in per-category functions.
//
// Defaults ship embedded (policies-default.toml); operators can replace the
// table with their own file.

mod definition;
mod registry;

pub use definition::{CategoryPolicy, CompiledPolicy};
pub use registry::PolicyTable;
