// All core functionality is in deparse-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod input;

// Re-export core types for convenience
pub use deparse_core::*;

// Re-export CLI utilities
pub use input::InputSource;
