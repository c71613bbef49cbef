// In-memory implementation of UserStore.
//
// **Why keep one next to the SQLite store?**
// - Lets tests (and quick local runs) exercise the full service without a
//   database file
// - Still follows the same contract, so the core can't tell the difference
//
// DashMap gives us a concurrent map without wrapping a HashMap in a Mutex,
// which matters because multiple Discord events can hit the store at once.

use crate::core::progression::{PlayerStats, ProgressionError, UserStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;

pub struct InMemoryUserStore {
    users: DashMap<u64, PlayerStats>,
}

impl InMemoryUserStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn exists(&self, user_id: u64) -> Result<bool, ProgressionError> {
        Ok(self.users.contains_key(&user_id))
    }

    async fn insert_many(&self, users: &[PlayerStats]) -> Result<(), ProgressionError> {
        // Reject the whole batch before writing anything, mirroring the
        // SQLite store's transactional behavior.
        if let Some(dup) = users.iter().find(|u| self.users.contains_key(&u.user_id)) {
            return Err(ProgressionError::Storage(format!(
                "duplicate user id {}",
                dup.user_id
            )));
        }

        for user in users {
            self.users.insert(user.user_id, user.clone());
        }
        Ok(())
    }

    async fn fetch(&self, user_id: u64) -> Result<PlayerStats, ProgressionError> {
        self.users
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .ok_or(ProgressionError::NotFound(user_id))
    }

    async fn increment_level(&self, user_id: u64) -> Result<(), ProgressionError> {
        match self.users.get_mut(&user_id) {
            Some(mut entry) => {
                entry.level += 1;
                Ok(())
            }
            None => Err(ProgressionError::NotFound(user_id)),
        }
    }

    async fn known_ids(&self) -> Result<HashSet<u64>, ProgressionError> {
        Ok(self.users.iter().map(|entry| *entry.key()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_fetches_records() {
        let store = InMemoryUserStore::new();

        assert!(!store.exists(1).await.unwrap());

        store
            .insert_many(&[PlayerStats::starting(1), PlayerStats::starting(2)])
            .await
            .unwrap();

        assert!(store.exists(1).await.unwrap());
        assert_eq!(store.fetch(2).await.unwrap(), PlayerStats::starting(2));
        assert_eq!(store.known_ids().await.unwrap(), HashSet::from([1, 2]));
    }

    #[tokio::test]
    async fn duplicate_batches_leave_the_map_untouched() {
        let store = InMemoryUserStore::new();
        store
            .insert_many(&[PlayerStats::starting(1)])
            .await
            .unwrap();

        let result = store
            .insert_many(&[PlayerStats::starting(3), PlayerStats::starting(1)])
            .await;

        assert!(result.is_err());
        assert!(!store.exists(3).await.unwrap());
    }

    #[tokio::test]
    async fn increment_level_only_touches_existing_rows() {
        let store = InMemoryUserStore::new();
        store
            .insert_many(&[PlayerStats::starting(1)])
            .await
            .unwrap();

        store.increment_level(1).await.unwrap();
        assert_eq!(store.fetch(1).await.unwrap().level, 2);

        assert!(matches!(
            store.increment_level(42).await,
            Err(ProgressionError::NotFound(42))
        ));
    }
}
