//! Planned workouts and the completed-workout log

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use crate::error::{FitTrackError, Result};
use crate::models::{Workout, WorkoutType};

/// Planned workouts plus the log of completed ones, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutBook {
    pub planned: Vec<Workout>,
    pub log: Vec<Workout>,
}

impl WorkoutBook {
    pub fn new(planned: Vec<Workout>, log: Vec<Workout>) -> Self {
        Self { planned, log }
    }

    pub fn add_planned(&mut self, workout: Workout) {
        info!(workout_id = %workout.id, workout_type = %workout.workout_type, "Workout added");
        self.planned.push(workout);
    }

    pub fn remove_planned(&mut self, id: &str) -> Result<Workout> {
        let index = find(&self.planned, id)?;
        info!(workout_id = %id, "Workout removed");
        Ok(self.planned.remove(index))
    }

    pub fn remove_logged(&mut self, id: &str) -> Result<Workout> {
        let index = find(&self.log, id)?;
        info!(workout_id = %id, "Workout removed from log");
        Ok(self.log.remove(index))
    }

    /// Copy a planned workout into the log under a new id dated `today`.
    /// The planned workout stays available for reuse.
    pub fn complete(&mut self, id: &str, today: NaiveDate) -> Result<Workout> {
        let planned = &self.planned[find(&self.planned, id)?];
        let logged = Workout {
            id: Uuid::new_v4().to_string(),
            date: today,
            ..planned.clone()
        };
        info!(planned_id = %id, workout_id = %logged.id, "Workout logged");
        self.log.insert(0, logged.clone());
        Ok(logged)
    }

    pub fn get(&self, id: &str) -> Option<&Workout> {
        self.planned.iter().chain(&self.log).find(|w| w.id == id)
    }
}

fn find(workouts: &[Workout], id: &str) -> Result<usize> {
    workouts
        .iter()
        .position(|w| w.id == id)
        .ok_or_else(|| FitTrackError::WorkoutNotFound(id.to_string()))
}

/// Sort key for workout listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Date,
    Duration,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date" => Ok(SortKey::Date),
            "duration" => Ok(SortKey::Duration),
            _ => Err(format!("Invalid sort key: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Search, filter and sort applied to a workout listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkoutQuery {
    /// Matched case-insensitively against the type, or as a substring of the ISO date
    pub search: String,
    pub type_filter: Option<WorkoutType>,
    pub sort_by: SortKey,
    pub order: SortOrder,
}

impl WorkoutQuery {
    pub fn matches(&self, workout: &Workout) -> bool {
        if self.type_filter.is_some_and(|t| t != workout.workout_type) {
            return false;
        }
        let needle = self.search.to_lowercase();
        workout.workout_type.as_str().to_lowercase().contains(&needle)
            || workout.date.to_string().contains(&self.search)
    }

    pub fn apply(&self, workouts: &[Workout]) -> Vec<Workout> {
        let mut selected: Vec<Workout> = workouts.iter().filter(|w| self.matches(w)).cloned().collect();
        selected.sort_by(|a, b| {
            let ordering: Ordering = match self.sort_by {
                SortKey::Date => a.date.cmp(&b.date),
                SortKey::Duration => a.duration.cmp(&b.duration),
            };
            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        selected
    }
}
