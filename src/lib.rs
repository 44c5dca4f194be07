// Library interface for fittrack modules
// The binary and the integration tests both go through this crate root

pub mod adapter;
pub mod ai;
pub mod config;
pub mod dates;
pub mod error;
pub mod goals;
pub mod logging;
pub mod models;
pub mod stats;
pub mod storage;
pub mod tracker;
pub mod workouts;

// Re-export commonly used types for convenience
pub use models::*;
pub use ai::{AiClient, TrainingSnapshot, WorkoutRequest};
pub use config::AppConfig;
pub use error::{FitTrackError, Result};
pub use goals::{GoalBook, GoalState, ProgressOutcome};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use stats::WorkoutSummary;
pub use storage::{MemoryStorage, SqliteStorage, Storage, Store};
pub use tracker::{Insights, PersistencePolicy, Tracker};
pub use workouts::{SortKey, SortOrder, WorkoutBook, WorkoutQuery};
