// Discord layer - commands and event handlers.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "roster/member_sync.rs"]
pub mod member_sync;

// Re-export command types for convenience
pub use commands::progression::{Data, Error};
