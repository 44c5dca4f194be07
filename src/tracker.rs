//! One entry point per user action
//!
//! The tracker owns the in-memory collections and writes the affected
//! collection(s) back to storage after every change.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ai::{AiClient, TrainingSnapshot};
use crate::dates::{self, Milestone};
use crate::error::{FitTrackError, Result, StorageError};
use crate::goals::{GoalBook, GoalState, ProgressOutcome};
use crate::models::{CompletedGoal, Goal, GoalDraft, Workout, WorkoutDraft, WorkoutType};
use crate::stats::{self, WorkoutSummary};
use crate::storage::{keys, Storage, Store};
use crate::workouts::{WorkoutBook, WorkoutQuery};

/// Window used by the dashboard's duration-by-type chart
pub const CHART_WINDOW_DAYS: u32 = 30;

/// What to do when a save fails after the in-memory state already changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistencePolicy {
    /// Surface the storage error to the caller. The in-memory change is kept,
    /// so a caller that carries on after the error should reopen the tracker
    /// to get back in line with storage.
    Strict,
    /// Log a warning and keep going with the in-memory state
    #[default]
    LogAndContinue,
}

/// Where a set of recommendations came from
#[derive(Debug, Clone, PartialEq)]
pub enum Insights {
    /// Nothing in the workout log to analyse yet
    NoHistory,
    Cached(Vec<String>),
    Generated(Vec<String>),
}

impl Insights {
    pub fn recommendations(&self) -> &[String] {
        match self {
            Insights::NoHistory => &[],
            Insights::Cached(r) | Insights::Generated(r) => r,
        }
    }
}

pub struct Tracker<S: Storage> {
    store: Store<S>,
    workouts: WorkoutBook,
    goals: GoalBook,
    policy: PersistencePolicy,
}

impl<S: Storage> Tracker<S> {
    /// Load every collection from `store`. Missing keys start empty.
    pub fn open(store: Store<S>, policy: PersistencePolicy) -> Result<Self> {
        let workouts = WorkoutBook::new(store.load_workouts()?, store.load_completed_workouts()?);
        let goals = GoalBook::new(store.load_goals()?, store.load_completed_goals()?);
        info!(
            planned = workouts.planned.len(),
            logged = workouts.log.len(),
            goals = goals.active.len(),
            completed_goals = goals.completed.len(),
            "Tracker loaded"
        );
        Ok(Self {
            store,
            workouts,
            goals,
            policy,
        })
    }

    pub fn workouts(&self) -> &WorkoutBook {
        &self.workouts
    }

    pub fn goals(&self) -> &GoalBook {
        &self.goals
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    // Workouts

    pub fn add_workout(&mut self, draft: WorkoutDraft, today: NaiveDate) -> Result<Workout> {
        let workout = draft.build(today)?;
        self.plan_workout(workout.clone())?;
        Ok(workout)
    }

    /// Add an already-built workout (e.g. a generated one) to the planned list
    pub fn plan_workout(&mut self, workout: Workout) -> Result<()> {
        self.workouts.add_planned(workout);
        self.save_planned()
    }

    pub fn remove_workout(&mut self, id: &str) -> Result<Workout> {
        let removed = self.workouts.remove_planned(id)?;
        self.save_planned()?;
        Ok(removed)
    }

    pub fn complete_workout(&mut self, id: &str, today: NaiveDate) -> Result<Workout> {
        let logged = self.workouts.complete(id, today)?;
        self.save_log()?;
        Ok(logged)
    }

    pub fn remove_logged(&mut self, id: &str) -> Result<Workout> {
        let removed = self.workouts.remove_logged(id)?;
        self.save_log()?;
        Ok(removed)
    }

    pub fn planned(&self, query: &WorkoutQuery) -> Vec<Workout> {
        query.apply(&self.workouts.planned)
    }

    pub fn log(&self, query: &WorkoutQuery) -> Vec<Workout> {
        query.apply(&self.workouts.log)
    }

    // Goals

    pub fn add_goal(&mut self, draft: GoalDraft, today: NaiveDate) -> Result<Goal> {
        let goal = draft.build(today)?;
        self.goals.add(goal.clone());
        self.save_active_goals()?;
        Ok(goal)
    }

    pub fn increment_goal_progress(&mut self, id: &str, today: NaiveDate) -> Result<ProgressOutcome> {
        let outcome = self.goals.increment_progress(id, today)?;
        self.save_after_progress(&outcome)?;
        Ok(outcome)
    }

    pub fn set_goal_progress(
        &mut self,
        id: &str,
        progress: u8,
        today: NaiveDate,
    ) -> Result<ProgressOutcome> {
        let outcome = self.goals.update_progress(id, progress, today)?;
        self.save_after_progress(&outcome)?;
        Ok(outcome)
    }

    pub fn complete_goal(&mut self, id: &str, today: NaiveDate) -> Result<CompletedGoal> {
        let completed = self.goals.complete(id, today)?;
        self.save_all_goals()?;
        Ok(completed)
    }

    pub fn reattempt_goal(&mut self, id: &str, now: DateTime<Utc>) -> Result<Goal> {
        let goal = self.goals.reattempt(id, now)?;
        self.save_all_goals()?;
        Ok(goal)
    }

    /// Delete a goal from whichever collection holds it
    pub fn delete_goal(&mut self, id: &str) -> Result<GoalState> {
        match self.goals.state_of(id) {
            Some(GoalState::Active) => {
                self.goals.delete_active(id)?;
                self.save_active_goals()?;
                Ok(GoalState::Active)
            }
            Some(GoalState::Completed) => {
                self.goals.delete_completed(id)?;
                self.save_completed_goals()?;
                Ok(GoalState::Completed)
            }
            None => Err(FitTrackError::GoalNotFound(id.to_string())),
        }
    }

    // Dashboard

    pub fn summary(&self) -> WorkoutSummary {
        WorkoutSummary::compute(
            &self.workouts.planned,
            &self.workouts.log,
            &self.goals.completed,
        )
    }

    pub fn milestones(&self, now: DateTime<Utc>) -> Vec<Milestone> {
        dates::upcoming_milestones(&self.goals.active, now)
    }

    /// Average minutes per type over the logged workouts of the last 30 days
    pub fn duration_by_type_recent(&self, today: NaiveDate) -> Vec<(WorkoutType, f64)> {
        let recent = dates::within_last_days(&self.workouts.log, today, CHART_WINDOW_DAYS);
        stats::average_duration_by_type(&recent)
    }

    /// Recommendations from the cache when fresh, otherwise freshly generated
    /// and cached. Nothing is generated while the workout log is empty, and
    /// `connect` is only called when a request has to be made.
    pub async fn insights<F>(
        &mut self,
        connect: F,
        now: DateTime<Utc>,
        refresh: bool,
    ) -> Result<Insights>
    where
        F: FnOnce() -> Result<AiClient>,
    {
        match self.cached_insights(now)? {
            Some(Insights::NoHistory) => return Ok(Insights::NoHistory),
            Some(found) if !refresh => return Ok(found),
            _ => {}
        }
        let client = connect()?;
        self.refresh_insights(&client, now).await
    }

    /// `NoHistory` or a fresh cache hit; `None` means recommendations need generating
    pub fn cached_insights(&mut self, now: DateTime<Utc>) -> Result<Option<Insights>> {
        if self.workouts.log.is_empty() {
            return Ok(Some(Insights::NoHistory));
        }
        let cached = match self.store.load_recommendations(now) {
            Ok(cached) => cached,
            Err(e) => {
                persist(self.policy, keys::RECOMMENDATIONS, Err(e))?;
                None
            }
        };
        Ok(cached.map(Insights::Cached))
    }

    /// Generate recommendations from the log and active goals, replacing the cache
    pub async fn refresh_insights(
        &mut self,
        client: &AiClient,
        now: DateTime<Utc>,
    ) -> Result<Insights> {
        if self.workouts.log.is_empty() {
            return Ok(Insights::NoHistory);
        }
        let snapshot = TrainingSnapshot::from_log(&self.workouts.log);
        let recommendations = client
            .generate_recommendations(&snapshot, &self.goals.active)
            .await?;
        let saved = self.store.save_recommendations(&recommendations, now);
        persist(self.policy, keys::RECOMMENDATIONS, saved)?;
        Ok(Insights::Generated(recommendations))
    }

    // Persistence

    fn save_planned(&mut self) -> Result<()> {
        let saved = self.store.save_workouts(&self.workouts.planned);
        persist(self.policy, keys::WORKOUTS, saved)
    }

    fn save_log(&mut self) -> Result<()> {
        let saved = self.store.save_completed_workouts(&self.workouts.log);
        persist(self.policy, keys::COMPLETED_WORKOUTS, saved)
    }

    fn save_active_goals(&mut self) -> Result<()> {
        let saved = self.store.save_goals(&self.goals.active);
        persist(self.policy, keys::GOALS, saved)
    }

    fn save_completed_goals(&mut self) -> Result<()> {
        let saved = self.store.save_completed_goals(&self.goals.completed);
        persist(self.policy, keys::COMPLETED_GOALS, saved)
    }

    fn save_all_goals(&mut self) -> Result<()> {
        self.save_active_goals()?;
        self.save_completed_goals()
    }

    fn save_after_progress(&mut self, outcome: &ProgressOutcome) -> Result<()> {
        match outcome {
            ProgressOutcome::Updated(_) => self.save_active_goals(),
            ProgressOutcome::Completed(_) => self.save_all_goals(),
        }
    }
}

fn persist(
    policy: PersistencePolicy,
    key: &str,
    result: std::result::Result<(), StorageError>,
) -> Result<()> {
    match (result, policy) {
        (Ok(()), _) => Ok(()),
        (Err(e), PersistencePolicy::Strict) => Err(e.into()),
        (Err(e), PersistencePolicy::LogAndContinue) => {
            warn!(key, error = %e, "Failed to persist, keeping in-memory state");
            Ok(())
        }
    }
}
