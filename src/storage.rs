//! Persistent key-value storage and the typed store on top of it
//!
//! Each collection lives under its own key as a JSON value, written
//! independently of the others. There is no transaction spanning keys.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::models::{CompletedGoal, Goal, Workout};

/// Keys used for each persisted collection
pub mod keys {
    pub const WORKOUTS: &str = "workouts";
    pub const COMPLETED_WORKOUTS: &str = "completedWorkouts";
    pub const GOALS: &str = "goals";
    pub const COMPLETED_GOALS: &str = "completedGoals";
    pub const RECOMMENDATIONS: &str = "recommendations";
}

/// Raw key → JSON storage backend
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn set(&mut self, key: &str, value: &Value) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// SQLite-backed storage: one row per key
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Create or open a database at the specified path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StorageError::Unavailable {
                    reason: format!("{}: {}", parent.display(), e),
                })?;
            }
        }
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    /// In-memory SQLite database, gone when dropped
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        let storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(())
    }
}

impl Storage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![key, text],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Process-local storage for tests and throwaway sessions
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, Value>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// Cached AI recommendations as persisted: `{savedAt, recommendations}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRecommendations {
    /// Epoch milliseconds
    pub saved_at: i64,
    pub recommendations: Vec<String>,
}

impl CachedRecommendations {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.timestamp_millis() - self.saved_at < ttl.num_milliseconds()
    }
}

/// Typed repository over the persisted collections
pub struct Store<S: Storage> {
    backend: S,
    recommendation_ttl: Duration,
}

impl<S: Storage> Store<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            recommendation_ttl: Duration::hours(24),
        }
    }

    pub fn with_recommendation_ttl(mut self, ttl: Duration) -> Self {
        self.recommendation_ttl = ttl;
        self
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn load_workouts(&self) -> Result<Vec<Workout>, StorageError> {
        self.load_list(keys::WORKOUTS)
    }

    pub fn save_workouts(&mut self, workouts: &[Workout]) -> Result<(), StorageError> {
        self.save(keys::WORKOUTS, &workouts)
    }

    pub fn load_completed_workouts(&self) -> Result<Vec<Workout>, StorageError> {
        self.load_list(keys::COMPLETED_WORKOUTS)
    }

    pub fn save_completed_workouts(&mut self, workouts: &[Workout]) -> Result<(), StorageError> {
        self.save(keys::COMPLETED_WORKOUTS, &workouts)
    }

    pub fn load_goals(&self) -> Result<Vec<Goal>, StorageError> {
        self.load_list(keys::GOALS)
    }

    pub fn save_goals(&mut self, goals: &[Goal]) -> Result<(), StorageError> {
        self.save(keys::GOALS, &goals)
    }

    pub fn load_completed_goals(&self) -> Result<Vec<CompletedGoal>, StorageError> {
        self.load_list(keys::COMPLETED_GOALS)
    }

    pub fn save_completed_goals(&mut self, goals: &[CompletedGoal]) -> Result<(), StorageError> {
        self.save(keys::COMPLETED_GOALS, &goals)
    }

    /// Cached recommendations if still fresh at `now`; a stale entry is removed
    pub fn load_recommendations(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<String>>, StorageError> {
        let Some(value) = self.backend.get(keys::RECOMMENDATIONS)? else {
            return Ok(None);
        };

        let cached: CachedRecommendations = match serde_json::from_value(value) {
            Ok(cached) => cached,
            Err(e) => {
                // unreadable cache is regenerated, not fatal
                warn!(error = %e, "Discarding unreadable recommendation cache");
                self.backend.remove(keys::RECOMMENDATIONS)?;
                return Ok(None);
            }
        };

        if cached.is_fresh(now, self.recommendation_ttl) {
            Ok(Some(cached.recommendations))
        } else {
            debug!(saved_at = cached.saved_at, "Recommendation cache expired");
            self.backend.remove(keys::RECOMMENDATIONS)?;
            Ok(None)
        }
    }

    /// Cache recommendations stamped with `now`. Empty lists are not cached.
    pub fn save_recommendations(
        &mut self,
        recommendations: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if recommendations.is_empty() {
            return Ok(());
        }
        let cached = CachedRecommendations {
            saved_at: now.timestamp_millis(),
            recommendations: recommendations.to_vec(),
        };
        self.save(keys::RECOMMENDATIONS, &cached)
    }

    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StorageError> {
        match self.backend.get(key)? {
            None => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let value =
            serde_json::to_value(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.backend.set(key, &value)?;
        debug!(key, "Saved");
        Ok(())
    }
}
