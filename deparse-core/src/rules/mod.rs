// Rule declarations and the registry that owns them.
// - declaration.rs: Rule, Aggregation and the merge functions
// - transform.rs: post-processing functions and the Skip outcome
// - registry.rs: name -> rule mapping, method table, lazy resolution
// - builtins.rs: named transforms for rule files

pub mod builtins;
pub mod declaration;
pub mod registry;
pub mod transform;

pub use declaration::{convention_name, merge_single, promote, Aggregation, Binding, Rule};
pub use registry::{Declaration, FunctionTable, RuleRegistry};
pub use transform::{single_arg, skip, Extracted, Transform};
