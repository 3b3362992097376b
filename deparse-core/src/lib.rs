// Deparse Core Library
//
// Declarative, line-oriented text extraction. Named regex rules are applied
// to every line; per-line results are merged into one record per stream.

pub mod config;
pub mod error;
pub mod expression;
pub mod parser;
pub mod rules;
pub mod serialization;
pub mod stats;
pub mod types;

// Re-export main types and functions for easy use
pub use config::{ParserConfig, ParserOptions, RuleConfig};
pub use error::{Error, Result};
pub use expression::Expression;
pub use parser::{Parser, ParserBuilder};
pub use rules::{builtins, Aggregation, Extracted, FunctionTable, Rule, RuleRegistry, Transform};
pub use serialization::{render_record, save_record, OutputFormat};
pub use stats::ParseStats;
pub use types::*;
