// This is the progression module - it contains the business logic for the
// RPG stat system. Notice how this module has NO Discord-specific code
// (no serenity, no poise imports). It works with primitive types (u64, u32)
// so it could be reused by a web app, CLI tool, or any other frontend.

use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::core::roster::unregistered_members;

// ============================================================================
// DOMAIN MODEL
// ============================================================================

// Starting values for a freshly created record. Levels begin at 1 and
// current resources begin full.
const STARTING_LEVEL: u32 = 1;
const STARTING_EXP: u64 = 0;
const STARTING_MAX_HP: u32 = 100;
const STARTING_MAX_MP: u32 = 50;
const STARTING_ATTRIBUTE: u32 = 1;

/// One progression record per Discord account.
///
/// The `user_id` is the account snowflake and the primary key; it never
/// changes. Everything else is game state: `level` only moves through
/// [`ProgressionService::level_up`], the attributes are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStats {
    pub user_id: u64,
    pub level: u32,
    pub exp: u64,
    pub max_hp: u32,
    pub current_hp: u32,
    pub max_mp: u32,
    pub current_mp: u32,
    pub strength: u32,
    pub agility: u32,
    pub intelligence: u32,
    pub defence: u32,
    pub magic_defence: u32,
}

impl PlayerStats {
    /// Build the record a brand-new player starts with: level 1, no exp,
    /// full resources, all attributes at their base value.
    pub fn starting(user_id: u64) -> Self {
        Self {
            user_id,
            level: STARTING_LEVEL,
            exp: STARTING_EXP,
            max_hp: STARTING_MAX_HP,
            current_hp: STARTING_MAX_HP,
            max_mp: STARTING_MAX_MP,
            current_mp: STARTING_MAX_MP,
            strength: STARTING_ATTRIBUTE,
            agility: STARTING_ATTRIBUTE,
            intelligence: STARTING_ATTRIBUTE,
            defence: STARTING_ATTRIBUTE,
            magic_defence: STARTING_ATTRIBUTE,
        }
    }
}

/// The multi-line stat sheet shown by `!status`. Max/current resource pairs
/// share a tab-separated line; every other stat gets its own line.
impl fmt::Display for PlayerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Level {}", self.level)?;
        writeln!(f, "Exp {}", self.exp)?;
        writeln!(f, "Max HP {}\tCurrent HP {}", self.max_hp, self.current_hp)?;
        writeln!(f, "Max MP {}\tCurrent MP {}", self.max_mp, self.current_mp)?;
        writeln!(f, "Strength {}", self.strength)?;
        writeln!(f, "Agility {}", self.agility)?;
        writeln!(f, "Intelligence {}", self.intelligence)?;
        writeln!(f, "Defence {}", self.defence)?;
        write!(f, "Magic Defence {}", self.magic_defence)
    }
}

/// Experience required to advance past `level`.
///
/// **Formula:** `round(4 * level^3 / 5)`, so thresholds grow cubically:
/// level 1 = 1, level 5 = 100, level 10 = 800.
///
/// Levels below 1 are outside the domain (records always start at 1); the
/// input is clamped to 1 rather than inventing an error case for them.
///
/// This is PURE business logic - no side effects, just math.
#[allow(dead_code)]
pub fn next_level_exp(level: u32) -> u64 {
    let level = level.max(1);
    ((4.0 * f64::from(level).powi(3)) / 5.0).round() as u64
}

// ============================================================================
// ERRORS
// ============================================================================
// We define our own error type rather than using generic errors.
// This keeps the three outcomes callers must tell apart explicit.

#[derive(Debug, Error)]
pub enum ProgressionError {
    /// Expected outcome, not an anomaly: the account has no record yet.
    #[error("No user record for id {0}")]
    NotFound(u64),

    /// Query or connection failure in the underlying store.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An account identifier that does not fit the storable numeric form.
    /// This indicates an invariant violation upstream and is worth a log.
    #[error("Malformed account id: {0}")]
    MalformedId(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================
// The core defines WHAT it needs from persistence, but not HOW it's
// implemented. The infra layer provides the actual implementations
// (SQLite for production, DashMap for tests).

/// Trait for persisting player records.
///
/// Every operation is atomic with respect to the store. "Row missing" is a
/// distinguishable result (`false` or [`ProgressionError::NotFound`]), never
/// conflated with transport failures, which surface as
/// [`ProgressionError::Storage`].
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Whether a record with this id exists. A missing row is a valid
    /// `false`, not an error.
    async fn exists(&self, user_id: u64) -> Result<bool, ProgressionError>;

    /// Insert all given records in one batch. Any duplicate id fails the
    /// whole batch. An empty slice is a no-op.
    async fn insert_many(&self, users: &[PlayerStats]) -> Result<(), ProgressionError>;

    /// Read one record; a missing row produces `NotFound`.
    async fn fetch(&self, user_id: u64) -> Result<PlayerStats, ProgressionError>;

    /// Atomically bump the level of exactly one row; `NotFound` if no row
    /// matched.
    async fn increment_level(&self, user_id: u64) -> Result<(), ProgressionError>;

    /// Every persisted account id. An empty store yields an empty set.
    async fn known_ids(&self) -> Result<HashSet<u64>, ProgressionError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// The main service for progression operations.
///
/// **Generic over S: UserStore** so the Discord layer can run against SQLite
/// while tests run against an in-memory store - the service doesn't care.
pub struct ProgressionService<S: UserStore> {
    /// The storage implementation (injected via constructor).
    store: S,
}

impl<S: UserStore> ProgressionService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reconcile a guild roster against the persisted records: any member
    /// not yet stored (and not the bot itself) gets a starting record.
    ///
    /// Returns how many new records were created. A store with zero users
    /// and an empty roster are both fine - the result is just 0.
    pub async fn sync_roster(
        &self,
        roster: &[u64],
        bot_id: u64,
    ) -> Result<usize, ProgressionError> {
        let known = self.store.known_ids().await?;
        let new_players = unregistered_members(roster, &known, bot_id);

        if new_players.is_empty() {
            return Ok(0);
        }

        self.store.insert_many(&new_players).await?;
        Ok(new_players.len())
    }

    /// Create a starting record for a newly joined member, unless one
    /// already exists. Returns whether a record was created.
    pub async fn register_member(&self, user_id: u64) -> Result<bool, ProgressionError> {
        if self.store.exists(user_id).await? {
            return Ok(false);
        }

        self.store
            .insert_many(&[PlayerStats::starting(user_id)])
            .await?;
        Ok(true)
    }

    /// Fetch a player's full stat record.
    pub async fn status(&self, user_id: u64) -> Result<PlayerStats, ProgressionError> {
        self.store.fetch(user_id).await
    }

    /// Advance a player one level. `NotFound` propagates so the caller can
    /// answer an unregistered account distinctly from a storage failure.
    pub async fn level_up(&self, user_id: u64) -> Result<(), ProgressionError> {
        self.store.increment_level(user_id).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Simple in-process store double, enough to drive the service paths.
    struct MapStore {
        users: Mutex<HashMap<u64, PlayerStats>>,
    }

    impl MapStore {
        fn new() -> Self {
            Self {
                users: Mutex::new(HashMap::new()),
            }
        }

        fn with_users(users: Vec<PlayerStats>) -> Self {
            let store = Self::new();
            {
                let mut map = store.users.lock().unwrap();
                for user in users {
                    map.insert(user.user_id, user);
                }
            }
            store
        }
    }

    #[async_trait]
    impl UserStore for MapStore {
        async fn exists(&self, user_id: u64) -> Result<bool, ProgressionError> {
            Ok(self.users.lock().unwrap().contains_key(&user_id))
        }

        async fn insert_many(&self, users: &[PlayerStats]) -> Result<(), ProgressionError> {
            let mut map = self.users.lock().unwrap();
            if let Some(dup) = users.iter().find(|u| map.contains_key(&u.user_id)) {
                return Err(ProgressionError::Storage(format!(
                    "duplicate id {}",
                    dup.user_id
                )));
            }
            for user in users {
                map.insert(user.user_id, user.clone());
            }
            Ok(())
        }

        async fn fetch(&self, user_id: u64) -> Result<PlayerStats, ProgressionError> {
            self.users
                .lock()
                .unwrap()
                .get(&user_id)
                .cloned()
                .ok_or(ProgressionError::NotFound(user_id))
        }

        async fn increment_level(&self, user_id: u64) -> Result<(), ProgressionError> {
            match self.users.lock().unwrap().get_mut(&user_id) {
                Some(user) => {
                    user.level += 1;
                    Ok(())
                }
                None => Err(ProgressionError::NotFound(user_id)),
            }
        }

        async fn known_ids(&self) -> Result<HashSet<u64>, ProgressionError> {
            Ok(self.users.lock().unwrap().keys().copied().collect())
        }
    }

    #[test]
    fn starting_stats_match_the_documented_defaults() {
        let stats = PlayerStats::starting(42);

        assert_eq!(stats.user_id, 42);
        assert_eq!(stats.level, 1);
        assert_eq!(stats.exp, 0);
        assert_eq!(stats.max_hp, 100);
        assert_eq!(stats.max_mp, 50);
        assert_eq!(stats.current_hp, stats.max_hp);
        assert_eq!(stats.current_mp, stats.max_mp);
        assert_eq!(stats.strength, 1);
        assert_eq!(stats.agility, 1);
        assert_eq!(stats.intelligence, 1);
        assert_eq!(stats.defence, 1);
        assert_eq!(stats.magic_defence, 1);
    }

    #[test]
    fn next_level_exp_matches_the_formula() {
        assert_eq!(next_level_exp(1), 1); // round(4/5)
        assert_eq!(next_level_exp(2), 6); // round(32/5)
        assert_eq!(next_level_exp(3), 22); // round(108/5)
        assert_eq!(next_level_exp(5), 100); // 4*125/5
        assert_eq!(next_level_exp(10), 800);
    }

    #[test]
    fn next_level_exp_clamps_levels_below_one() {
        assert_eq!(next_level_exp(0), next_level_exp(1));
    }

    #[test]
    fn stat_sheet_lists_every_stat() {
        let mut stats = PlayerStats::starting(1);
        stats.level = 3;

        let sheet = stats.to_string();
        assert!(sheet.starts_with("Level 3\n"));
        assert!(sheet.contains("Exp 0"));
        assert!(sheet.contains("Max HP 100\tCurrent HP 100"));
        assert!(sheet.contains("Max MP 50\tCurrent MP 50"));
        assert!(sheet.contains("Strength 1"));
        assert!(sheet.ends_with("Magic Defence 1"));
    }

    #[tokio::test]
    async fn register_member_creates_a_record_once() {
        let service = ProgressionService::new(MapStore::new());

        assert!(service.register_member(7).await.unwrap());
        assert!(!service.register_member(7).await.unwrap());

        let stats = service.status(7).await.unwrap();
        assert_eq!(stats, PlayerStats::starting(7));
    }

    #[tokio::test]
    async fn sync_roster_registers_only_unknown_members() {
        let mut veteran = PlayerStats::starting(1);
        veteran.level = 3;
        let service = ProgressionService::new(MapStore::with_users(vec![veteran]));

        let bot_id = 99;
        let inserted = service.sync_roster(&[1, 2, bot_id], bot_id).await.unwrap();
        assert_eq!(inserted, 1);

        // The veteran kept its level, the newcomer starts fresh, the bot
        // never got a record.
        assert_eq!(service.status(1).await.unwrap().level, 3);
        assert_eq!(service.status(2).await.unwrap().level, 1);
        assert!(matches!(
            service.status(bot_id).await,
            Err(ProgressionError::NotFound(99))
        ));
    }

    #[tokio::test]
    async fn sync_roster_with_empty_roster_inserts_nothing() {
        let service = ProgressionService::new(MapStore::new());
        assert_eq!(service.sync_roster(&[], 99).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn status_for_unknown_user_is_not_found() {
        let service = ProgressionService::new(MapStore::new());
        assert!(matches!(
            service.status(404).await,
            Err(ProgressionError::NotFound(404))
        ));
    }

    #[tokio::test]
    async fn level_up_for_unknown_user_is_not_found_and_changes_nothing() {
        let service = ProgressionService::new(MapStore::new());

        assert!(matches!(
            service.level_up(404).await,
            Err(ProgressionError::NotFound(404))
        ));
        // No phantom record appeared: registering still creates one.
        assert!(service.register_member(404).await.unwrap());
    }

    #[tokio::test]
    async fn level_up_bumps_exactly_one_level() {
        let service = ProgressionService::new(MapStore::new());
        service.register_member(5).await.unwrap();

        service.level_up(5).await.unwrap();
        assert_eq!(service.status(5).await.unwrap().level, 2);
    }

    #[test]
    fn error_messages_are_descriptive() {
        assert_eq!(
            ProgressionError::NotFound(12).to_string(),
            "No user record for id 12"
        );
        assert!(ProgressionError::Storage("db down".into())
            .to_string()
            .contains("db down"));
    }
}
