//! Command handlers for the Ragvault CLI.
//!
//! Each handler receives an opened store and writes its result to stdout.

pub mod documents;
pub mod search;
pub mod stats;

// Re-export command types for convenience
pub use documents::{AddCommand, ClearCommand, DeleteCommand, ListCommand};
pub use search::SearchCommand;
pub use stats::{HealthCommand, StatsCommand};
