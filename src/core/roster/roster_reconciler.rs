// Roster reconciliation - the pure half of membership sync.
//
// Given the guild's current member list and the set of ids already stored,
// work out which members still need a record. Persisting the result is the
// caller's job (see ProgressionService::sync_roster), so this stays a plain
// function over plain collections and tests trivially.

use std::collections::HashSet;

use crate::core::progression::PlayerStats;

/// Members of `roster` that have no stored record yet, each wrapped as a
/// starting record. The bot's own account never gets one.
///
/// An empty roster yields an empty vec, and an empty `known` set is valid
/// (a brand-new store just means everyone is unregistered). Output order
/// follows the roster but callers must not rely on it.
pub fn unregistered_members(
    roster: &[u64],
    known: &HashSet<u64>,
    bot_id: u64,
) -> Vec<PlayerStats> {
    roster
        .iter()
        .copied()
        .filter(|id| !known.contains(id) && *id != bot_id)
        .map(PlayerStats::starting)
        .collect()
}
