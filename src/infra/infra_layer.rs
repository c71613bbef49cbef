// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "progression/user_store.rs"]
pub mod progression;
