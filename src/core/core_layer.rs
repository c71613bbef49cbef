// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "progression/progression_service.rs"]
pub mod progression;

#[path = "roster/roster_reconciler.rs"]
pub mod roster;
