//! Command implementations for the ocrbench CLI
//!
//! Each command has its own module/file.

pub mod batch;
pub mod compare;
pub mod eval;
pub mod kappa;
pub mod reports;
pub mod schema;

// Re-export argument types for parser
pub use batch::BatchArgs;
pub use compare::CompareArgs;
pub use eval::EvalArgs;
pub use kappa::KappaArgs;
pub use reports::ReportsArgs;
pub use schema::SchemaArgs;
