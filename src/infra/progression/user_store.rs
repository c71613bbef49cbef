// Implementations for the progression store.
#![allow(unused_imports)]

pub mod in_memory;
pub mod sqlite_store;

// Re-export for convenience
pub use in_memory::InMemoryUserStore;
pub use sqlite_store::SqliteUserStore;
