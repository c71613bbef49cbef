// SQLite implementation of the UserStore trait.

use crate::core::progression::{PlayerStats, ProgressionError, UserStore};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::HashSet;
use std::path::Path;

pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    /// Create a new SQLite user store at the given database path.
    ///
    /// The file (and its parent directory) is created if missing, and the
    /// schema migration runs before the store is handed out.
    pub async fn new(database_path: &str) -> anyhow::Result<Self> {
        let path_str = database_path.trim_start_matches("sqlite://");
        if !database_path.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let connection_string = if database_path.starts_with("sqlite:") {
            database_path.to_string()
        } else {
            format!("sqlite://{}", database_path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations to create tables.
    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id       INTEGER PRIMARY KEY,
                level         INTEGER NOT NULL DEFAULT 1,
                exp           INTEGER NOT NULL DEFAULT 0,
                max_hp        INTEGER NOT NULL,
                current_hp    INTEGER NOT NULL,
                max_mp        INTEGER NOT NULL,
                current_mp    INTEGER NOT NULL,
                strength      INTEGER NOT NULL,
                agility       INTEGER NOT NULL,
                intelligence  INTEGER NOT NULL,
                defence       INTEGER NOT NULL,
                magic_defence INTEGER NOT NULL,
                created_at    TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// Snowflakes are u64 but SQLite integers are signed. Real Discord ids fit
// comfortably in i64; one that doesn't means something upstream handed us
// garbage, which gets its own error variant instead of a silent wrap.
fn encode_id(user_id: u64) -> Result<i64, ProgressionError> {
    i64::try_from(user_id).map_err(|_| ProgressionError::MalformedId(user_id.to_string()))
}

fn decode_id(raw: i64) -> Result<u64, ProgressionError> {
    u64::try_from(raw).map_err(|_| ProgressionError::MalformedId(raw.to_string()))
}

fn storage_err(e: sqlx::Error) -> ProgressionError {
    ProgressionError::Storage(e.to_string())
}

fn row_to_stats(row: &sqlx::sqlite::SqliteRow) -> Result<PlayerStats, ProgressionError> {
    Ok(PlayerStats {
        user_id: decode_id(row.get::<i64, _>("user_id"))?,
        level: row.get::<i64, _>("level") as u32,
        exp: row.get::<i64, _>("exp") as u64,
        max_hp: row.get::<i64, _>("max_hp") as u32,
        current_hp: row.get::<i64, _>("current_hp") as u32,
        max_mp: row.get::<i64, _>("max_mp") as u32,
        current_mp: row.get::<i64, _>("current_mp") as u32,
        strength: row.get::<i64, _>("strength") as u32,
        agility: row.get::<i64, _>("agility") as u32,
        intelligence: row.get::<i64, _>("intelligence") as u32,
        defence: row.get::<i64, _>("defence") as u32,
        magic_defence: row.get::<i64, _>("magic_defence") as u32,
    })
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn exists(&self, user_id: u64) -> Result<bool, ProgressionError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE user_id = ?")
            .bind(encode_id(user_id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(row.is_some())
    }

    async fn insert_many(&self, users: &[PlayerStats]) -> Result<(), ProgressionError> {
        if users.is_empty() {
            return Ok(());
        }

        // One transaction for the whole batch: a duplicate id aborts all of
        // it, so a half-synced roster can't be left behind.
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        for user in users {
            sqlx::query(
                r#"
                INSERT INTO users (
                    user_id, level, exp, max_hp, current_hp, max_mp,
                    current_mp, strength, agility, intelligence, defence,
                    magic_defence
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(encode_id(user.user_id)?)
            .bind(user.level as i64)
            .bind(user.exp as i64)
            .bind(user.max_hp as i64)
            .bind(user.current_hp as i64)
            .bind(user.max_mp as i64)
            .bind(user.current_mp as i64)
            .bind(user.strength as i64)
            .bind(user.agility as i64)
            .bind(user.intelligence as i64)
            .bind(user.defence as i64)
            .bind(user.magic_defence as i64)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }

        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }

    async fn fetch(&self, user_id: u64) -> Result<PlayerStats, ProgressionError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, level, exp, max_hp, current_hp, max_mp,
                   current_mp, strength, agility, intelligence, defence,
                   magic_defence
            FROM users WHERE user_id = ?
            "#,
        )
        .bind(encode_id(user_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        match row {
            Some(row) => row_to_stats(&row),
            None => Err(ProgressionError::NotFound(user_id)),
        }
    }

    async fn increment_level(&self, user_id: u64) -> Result<(), ProgressionError> {
        let result = sqlx::query("UPDATE users SET level = level + 1 WHERE user_id = ?")
            .bind(encode_id(user_id)?)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(ProgressionError::NotFound(user_id));
        }
        Ok(())
    }

    async fn known_ids(&self) -> Result<HashSet<u64>, ProgressionError> {
        let rows = sqlx::query("SELECT user_id FROM users")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        let mut ids = HashSet::with_capacity(rows.len());
        for row in rows {
            ids.insert(decode_id(row.get::<i64, _>("user_id"))?);
        }
        Ok(ids)
    }
}
