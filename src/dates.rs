//! Date bucketing helpers: rolling windows and deadline countdowns

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::models::{Goal, Workout};

/// Days a reattempted goal gets before its new deadline
pub const REATTEMPT_WINDOW_DAYS: i64 = 30;

/// Milestones at or under this many days are flagged as urgent
pub const URGENT_WITHIN_DAYS: i64 = 7;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// The `n` calendar days ending at `today`, oldest first
pub fn last_n_days(today: NaiveDate, n: u32) -> Vec<NaiveDate> {
    (0..i64::from(n))
        .rev()
        .map(|back| today - Duration::days(back))
        .collect()
}

/// Workouts dated inside the `n`-day window ending at `today`
pub fn within_last_days(workouts: &[Workout], today: NaiveDate, n: u32) -> Vec<Workout> {
    let Some(start) = last_n_days(today, n).first().copied() else {
        return Vec::new();
    };
    workouts
        .iter()
        .filter(|w| w.date >= start)
        .cloned()
        .collect()
}

/// Deadline instant: start of the deadline day in UTC
fn deadline_instant(deadline: NaiveDate) -> DateTime<Utc> {
    deadline.and_time(NaiveTime::MIN).and_utc()
}

/// Whole days until `deadline`, rounded up. Negative or zero once it has passed.
pub fn days_until(deadline: NaiveDate, now: DateTime<Utc>) -> i64 {
    let millis = (deadline_instant(deadline) - now).num_milliseconds();
    // ceil for positive values, truncation toward zero is fine once past due
    if millis > 0 {
        (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    } else {
        millis / MILLIS_PER_DAY
    }
}

/// New deadline for a goal reattempted at `now`
pub fn reattempt_deadline(now: DateTime<Utc>) -> NaiveDate {
    (now + Duration::days(REATTEMPT_WINDOW_DAYS)).date_naive()
}

/// A goal with time still left on it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Milestone {
    pub goal: Goal,
    pub days_remaining: i64,
}

impl Milestone {
    pub fn is_urgent(&self) -> bool {
        self.days_remaining <= URGENT_WITHIN_DAYS
    }
}

/// Goals whose deadline is still ahead of `now`, soonest first
pub fn upcoming_milestones(goals: &[Goal], now: DateTime<Utc>) -> Vec<Milestone> {
    let mut milestones: Vec<Milestone> = goals
        .iter()
        .filter(|g| deadline_instant(g.deadline) > now)
        .map(|g| Milestone {
            goal: g.clone(),
            days_remaining: days_until(g.deadline, now),
        })
        .collect();
    milestones.sort_by_key(|m| m.days_remaining);
    milestones
}

/// Long display form, e.g. "March 4, 2024"
pub fn format_long(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn goal(id: &str, deadline: NaiveDate) -> Goal {
        Goal {
            id: id.to_string(),
            goal_type: "Endurance".to_string(),
            target: "Run 5 miles".to_string(),
            deadline,
            progress: 0,
            motivation: String::new(),
        }
    }

    #[test]
    fn test_last_n_days() {
        let days = last_n_days(date(2024, 3, 2), 3);
        assert_eq!(days, vec![date(2024, 2, 29), date(2024, 3, 1), date(2024, 3, 2)]);
        assert!(last_n_days(date(2024, 3, 2), 0).is_empty());
    }

    #[test]
    fn test_within_last_days() {
        let today = date(2024, 3, 30);
        let old = Workout::new(date(2024, 2, 29), crate::models::WorkoutType::Cardio, vec![]);
        let edge = Workout::new(date(2024, 3, 1), crate::models::WorkoutType::Cardio, vec![]);
        let recent = within_last_days(&[old, edge.clone()], today, 30);
        assert_eq!(recent, vec![edge]);
    }

    #[test]
    fn test_days_until_rounds_up() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();
        // 6 hours away still counts as a day
        assert_eq!(days_until(date(2024, 3, 2), now), 1);
        assert_eq!(days_until(date(2024, 3, 8), now), 7);
        assert!(days_until(date(2024, 3, 1), now) <= 0);
    }

    #[test]
    fn test_upcoming_milestones_sorted_and_future_only() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let goals = vec![
            goal("late", date(2024, 4, 1)),
            goal("past", date(2024, 2, 1)),
            goal("soon", date(2024, 3, 5)),
            goal("today", date(2024, 3, 1)),
        ];

        let milestones = upcoming_milestones(&goals, now);
        let ids: Vec<&str> = milestones.iter().map(|m| m.goal.id.as_str()).collect();
        assert_eq!(ids, vec!["soon", "late"]);
        assert!(milestones[0].is_urgent());
        assert!(!milestones[1].is_urgent());
        assert!(milestones.windows(2).all(|w| w[0].days_remaining <= w[1].days_remaining));
    }

    #[test]
    fn test_reattempt_deadline() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 23, 30, 0).unwrap();
        assert_eq!(reattempt_deadline(now), date(2024, 2, 14));
    }

    #[test]
    fn test_format_long() {
        assert_eq!(format_long(date(2024, 3, 4)), "March 4, 2024");
    }
}
