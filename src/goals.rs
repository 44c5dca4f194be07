//! Goal lifecycle: Active ⇄ Completed
//!
//! Every transition takes the goal out of one collection and puts it into
//! the other within a single `&mut self` call, so a goal id is never visible
//! in both collections or in neither.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dates::reattempt_deadline;
use crate::error::{FitTrackError, Result};
use crate::models::{CompletedGoal, Goal};

/// Progress step used by the quick "update progress" action
pub const PROGRESS_STEP: u8 = 10;

/// Progress value that completes a goal
pub const PROGRESS_COMPLETE: u8 = 100;

/// Result of a progress update
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressOutcome {
    /// Goal stays active with the new progress
    Updated(Goal),
    /// Goal reached 100 and moved to the completed set
    Completed(CompletedGoal),
}

/// Which collection a goal lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalState {
    Active,
    Completed,
}

/// Active and completed goals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalBook {
    pub active: Vec<Goal>,
    pub completed: Vec<CompletedGoal>,
}

impl GoalBook {
    pub fn new(active: Vec<Goal>, completed: Vec<CompletedGoal>) -> Self {
        Self { active, completed }
    }

    pub fn state_of(&self, id: &str) -> Option<GoalState> {
        if self.active.iter().any(|g| g.id == id) {
            Some(GoalState::Active)
        } else if self.completed.iter().any(|g| g.id == id) {
            Some(GoalState::Completed)
        } else {
            None
        }
    }

    pub fn add(&mut self, goal: Goal) {
        info!(goal_id = %goal.id, goal_type = %goal.goal_type, "Goal created");
        self.active.push(goal);
    }

    /// Set progress, clamped to 100. Reaching 100 completes the goal dated `today`.
    pub fn update_progress(
        &mut self,
        id: &str,
        progress: u8,
        today: NaiveDate,
    ) -> Result<ProgressOutcome> {
        let index = self.active_index(id)?;
        let progress = progress.min(PROGRESS_COMPLETE);

        if progress == PROGRESS_COMPLETE {
            let goal = self.active.remove(index);
            let completed = self.push_completed(goal, today);
            return Ok(ProgressOutcome::Completed(completed));
        }

        let goal = &mut self.active[index];
        goal.progress = progress;
        info!(goal_id = %id, progress, "Goal progress updated");
        Ok(ProgressOutcome::Updated(goal.clone()))
    }

    /// Bump progress by one step, capped at 100
    pub fn increment_progress(&mut self, id: &str, today: NaiveDate) -> Result<ProgressOutcome> {
        let current = self.active[self.active_index(id)?].progress;
        let next = current.saturating_add(PROGRESS_STEP).min(PROGRESS_COMPLETE);
        self.update_progress(id, next, today)
    }

    /// Mark an active goal complete regardless of its progress
    pub fn complete(&mut self, id: &str, today: NaiveDate) -> Result<CompletedGoal> {
        let index = self.active_index(id)?;
        let goal = self.active.remove(index);
        Ok(self.push_completed(goal, today))
    }

    /// Move a completed goal back to active with zero progress and a fresh 30-day deadline
    pub fn reattempt(&mut self, id: &str, now: DateTime<Utc>) -> Result<Goal> {
        let index = self
            .completed
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| FitTrackError::GoalNotFound(id.to_string()))?;

        let goal = self.completed.remove(index).into_active(reattempt_deadline(now));
        info!(goal_id = %goal.id, deadline = %goal.deadline, "Goal reattempted");
        self.active.push(goal.clone());
        Ok(goal)
    }

    pub fn delete_active(&mut self, id: &str) -> Result<Goal> {
        let index = self.active_index(id)?;
        info!(goal_id = %id, "Active goal deleted");
        Ok(self.active.remove(index))
    }

    pub fn delete_completed(&mut self, id: &str) -> Result<CompletedGoal> {
        let index = self
            .completed
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| FitTrackError::GoalNotFound(id.to_string()))?;
        info!(goal_id = %id, "Completed goal deleted");
        Ok(self.completed.remove(index))
    }

    fn active_index(&self, id: &str) -> Result<usize> {
        self.active
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| FitTrackError::GoalNotFound(id.to_string()))
    }

    fn push_completed(&mut self, goal: Goal, today: NaiveDate) -> CompletedGoal {
        let completed = goal.into_completed(today);
        info!(goal_id = %completed.id, "Goal completed");
        self.completed.push(completed.clone());
        completed
    }
}
