//! CLI command implementations.
//!
//! - [`handle`] - Process one delivered notification
//! - [`check`] - Dry-run the rule against live alarm state
//! - [`validate`] - Resolve and print the rule

pub mod check;
pub mod handle;
pub mod validate;

pub use check::CheckCommand;
pub use handle::HandleCommand;
pub use validate::ValidateCommand;
