//! Derived statistics over workouts and goals
//!
//! Everything here is a pure function over in-memory slices. Frequency and
//! extremum lookups walk buckets in first-encountered order and replace the
//! running best only on a strictly better value, so ties always go to the
//! earliest bucket.

use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

use crate::models::{CompletedGoal, Workout, WorkoutType};

pub use crate::dates::{upcoming_milestones, Milestone};

/// Canonical weekday order used for bucketing, independent of locale
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Full English weekday name
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Counts keyed values while remembering the order keys first appeared
#[derive(Debug, Clone)]
struct OrderedTally<K> {
    order: Vec<K>,
    counts: HashMap<K, u64>,
}

impl<K: Eq + Hash + Clone> OrderedTally<K> {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            counts: HashMap::new(),
        }
    }

    fn add(&mut self, key: &K, amount: u64) {
        match self.counts.get_mut(key) {
            Some(count) => *count += amount,
            None => {
                self.order.push(key.clone());
                self.counts.insert(key.clone(), amount);
            }
        }
    }

    /// Entries in first-encountered order
    fn entries(&self) -> impl Iterator<Item = (&K, u64)> + '_ {
        self.order.iter().map(move |k| (k, self.counts[k]))
    }

    /// Key with the highest count; first one wins a tie
    fn most_frequent(&self) -> Option<K> {
        let mut best: Option<(&K, u64)> = None;
        for (key, count) in self.entries() {
            if best.map_or(true, |(_, max)| count > max) {
                best = Some((key, count));
            }
        }
        best.map(|(key, _)| key.clone())
    }
}

/// Sum of workout durations in minutes
pub fn total_duration(workouts: &[Workout]) -> u64 {
    workouts.iter().map(|w| u64::from(w.duration)).sum()
}

/// Mean workout duration in minutes, 0 for an empty slice
pub fn average_duration(workouts: &[Workout]) -> f64 {
    if workouts.is_empty() {
        return 0.0;
    }
    total_duration(workouts) as f64 / workouts.len() as f64
}

/// Most common exercise name across both collections, `None` when there are no exercises
pub fn most_frequent_exercise_name(workouts: &[Workout], completed: &[Workout]) -> Option<String> {
    let mut tally = OrderedTally::new();
    for exercise in workouts.iter().chain(completed).flat_map(|w| &w.exercises) {
        tally.add(&exercise.name().to_string(), 1);
    }
    tally.most_frequent()
}

/// Most common workout type, `None` for an empty slice
pub fn most_frequent_workout_type(workouts: &[Workout]) -> Option<WorkoutType> {
    let mut tally = OrderedTally::new();
    for workout in workouts {
        tally.add(&workout.workout_type, 1);
    }
    tally.most_frequent()
}

/// Number of workouts per type, in first-encountered order
pub fn workout_type_counts(workouts: &[Workout]) -> Vec<(WorkoutType, u64)> {
    let mut tally = OrderedTally::new();
    for workout in workouts {
        tally.add(&workout.workout_type, 1);
    }
    tally.entries().map(|(t, c)| (*t, c)).collect()
}

/// Average duration per workout type, in first-encountered order
pub fn average_duration_by_type(workouts: &[Workout]) -> Vec<(WorkoutType, f64)> {
    let mut totals = OrderedTally::new();
    let mut counts = HashMap::new();
    for workout in workouts {
        totals.add(&workout.workout_type, u64::from(workout.duration));
        *counts.entry(workout.workout_type).or_insert(0u64) += 1;
    }
    totals
        .entries()
        .map(|(t, total)| (*t, total as f64 / counts[t] as f64))
        .collect()
}

/// Total minutes per weekday plus the busiest and quietest days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayActivity {
    /// Minutes per weekday, Monday first
    pub minutes: [u64; 7],
    pub most_active: Weekday,
    pub least_active: Weekday,
}

impl WeekdayActivity {
    pub fn minutes_on(&self, day: Weekday) -> u64 {
        self.minutes[day.num_days_from_monday() as usize]
    }
}

/// Bucket workout minutes from both collections into weekdays
pub fn activity_by_weekday(workouts: &[Workout], completed: &[Workout]) -> WeekdayActivity {
    let mut minutes = [0u64; 7];
    for workout in workouts.iter().chain(completed) {
        minutes[workout.date.weekday().num_days_from_monday() as usize] +=
            u64::from(workout.duration);
    }

    let mut most = (WEEKDAYS[0], minutes[0]);
    let mut least = (WEEKDAYS[0], minutes[0]);
    for (day, &total) in WEEKDAYS.iter().zip(minutes.iter()).skip(1) {
        if total > most.1 {
            most = (*day, total);
        }
        if total < least.1 {
            least = (*day, total);
        }
    }

    WeekdayActivity {
        minutes,
        most_active: most.0,
        least_active: least.0,
    }
}

/// Dashboard summary figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    /// Minutes across the workout log
    pub total_minutes: u64,
    /// Mean minutes per logged workout
    pub average_minutes: f64,
    pub completed_workouts: usize,
    pub completed_goals: usize,
    /// Most common exercise across planned and logged workouts
    pub favorite_exercise: Option<String>,
    pub activity: WeekdayActivity,
    /// Most common type in the workout log
    pub most_frequent_type: Option<WorkoutType>,
}

impl WorkoutSummary {
    pub fn compute(
        workouts: &[Workout],
        completed_workouts: &[Workout],
        completed_goals: &[CompletedGoal],
    ) -> Self {
        Self {
            total_minutes: total_duration(completed_workouts),
            average_minutes: average_duration(completed_workouts),
            completed_workouts: completed_workouts.len(),
            completed_goals: completed_goals.len(),
            favorite_exercise: most_frequent_exercise_name(workouts, completed_workouts),
            activity: activity_by_weekday(workouts, completed_workouts),
            most_frequent_type: most_frequent_workout_type(completed_workouts),
        }
    }

    /// Labelled figures as shown on the dashboard, `-` where there is no data
    pub fn display_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total workout time", format!("{} min", self.total_minutes)),
            ("Average workout time", format!("{:.1} min", self.average_minutes)),
            ("Completed workouts", self.completed_workouts.to_string()),
            ("Completed goals", self.completed_goals.to_string()),
            (
                "Favorite exercise",
                self.favorite_exercise.clone().unwrap_or_else(|| "-".to_string()),
            ),
            (
                "Most frequent type",
                self.most_frequent_type
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            ("Most active day", weekday_name(self.activity.most_active).to_string()),
            ("Least active day", weekday_name(self.activity.least_active).to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Exercise;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn workout_on(date: NaiveDate, workout_type: WorkoutType, exercises: &[(&str, u32)]) -> Workout {
        Workout::new(
            date,
            workout_type,
            exercises
                .iter()
                .map(|(name, minutes)| Exercise::cardio(*name, *minutes))
                .collect(),
        )
    }

    fn with_duration(duration: u32) -> Workout {
        workout_on(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            WorkoutType::Cardio,
            &[("Run", duration)],
        )
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_total_and_average_duration() {
        let workouts = vec![with_duration(30), with_duration(45), with_duration(15)];
        assert_eq!(total_duration(&workouts), 90);
        assert_eq!(average_duration(&workouts), 30.0);
    }

    #[test]
    fn test_empty_collections() {
        assert_eq!(total_duration(&[]), 0);
        assert_eq!(average_duration(&[]), 0.0);
        assert_eq!(most_frequent_exercise_name(&[], &[]), None);
        assert_eq!(most_frequent_workout_type(&[]), None);
        assert!(workout_type_counts(&[]).is_empty());
    }

    #[test]
    fn test_most_frequent_exercise_across_collections() {
        let planned = vec![workout_on(monday(), WorkoutType::Strength, &[("Squat", 10)])];
        let logged = vec![workout_on(
            monday(),
            WorkoutType::Strength,
            &[("Squat", 10), ("Bench", 10)],
        )];
        assert_eq!(
            most_frequent_exercise_name(&planned, &logged),
            Some("Squat".to_string())
        );
    }

    #[test]
    fn test_ties_go_to_first_encountered() {
        let planned = vec![workout_on(monday(), WorkoutType::Cardio, &[("Row", 5), ("Bike", 5)])];
        let logged = vec![workout_on(monday(), WorkoutType::Cardio, &[("Bike", 5), ("Row", 5)])];
        assert_eq!(
            most_frequent_exercise_name(&planned, &logged),
            Some("Row".to_string())
        );

        let workouts = vec![
            workout_on(monday(), WorkoutType::Flexibility, &[("Yoga", 20)]),
            workout_on(monday(), WorkoutType::Cardio, &[("Run", 20)]),
        ];
        assert_eq!(
            most_frequent_workout_type(&workouts),
            Some(WorkoutType::Flexibility)
        );
    }

    #[test]
    fn test_type_counts_and_averages_keep_encounter_order() {
        let workouts = vec![
            workout_on(monday(), WorkoutType::Strength, &[("Squat", 40)]),
            workout_on(monday(), WorkoutType::Cardio, &[("Run", 30)]),
            workout_on(monday(), WorkoutType::Strength, &[("Bench", 20)]),
        ];
        assert_eq!(
            workout_type_counts(&workouts),
            vec![(WorkoutType::Strength, 2), (WorkoutType::Cardio, 1)]
        );
        assert_eq!(
            average_duration_by_type(&workouts),
            vec![(WorkoutType::Strength, 30.0), (WorkoutType::Cardio, 30.0)]
        );
    }

    #[test]
    fn test_activity_by_weekday() {
        let wednesday = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let planned = vec![workout_on(wednesday, WorkoutType::Cardio, &[("Run", 30)])];
        let logged = vec![
            workout_on(saturday, WorkoutType::Cardio, &[("Run", 20)]),
            workout_on(saturday, WorkoutType::Cardio, &[("Run", 20)]),
        ];

        let activity = activity_by_weekday(&planned, &logged);
        assert_eq!(activity.minutes_on(Weekday::Wed), 30);
        assert_eq!(activity.minutes_on(Weekday::Sat), 40);
        assert_eq!(activity.most_active, Weekday::Sat);
        // Monday is the first of the zero-minute days
        assert_eq!(activity.least_active, Weekday::Mon);
    }

    #[test]
    fn test_activity_without_workouts_defaults_to_monday() {
        let activity = activity_by_weekday(&[], &[]);
        assert_eq!(activity.most_active, Weekday::Mon);
        assert_eq!(activity.least_active, Weekday::Mon);
        assert_eq!(weekday_name(activity.most_active), "Monday");
    }

    #[test]
    fn test_summary() {
        let planned = vec![workout_on(monday(), WorkoutType::Strength, &[("Squat", 30)])];
        let logged = vec![
            workout_on(monday(), WorkoutType::Cardio, &[("Run", 30)]),
            workout_on(monday(), WorkoutType::Cardio, &[("Run", 45)]),
            workout_on(monday(), WorkoutType::Strength, &[("Squat", 15)]),
        ];

        let summary = WorkoutSummary::compute(&planned, &logged, &[]);
        assert_eq!(summary.total_minutes, 90);
        assert_eq!(summary.average_minutes, 30.0);
        assert_eq!(summary.completed_workouts, 3);
        assert_eq!(summary.completed_goals, 0);
        // Squat appears once planned and once logged, Run twice logged: Squat is seen first
        assert_eq!(summary.favorite_exercise, Some("Squat".to_string()));
        assert_eq!(summary.most_frequent_type, Some(WorkoutType::Cardio));
    }

    proptest! {
        #[test]
        fn test_total_duration_is_order_independent(
            durations in proptest::collection::vec(0u32..600, 1..40)
        ) {
            let workouts: Vec<Workout> = durations.iter().map(|d| with_duration(*d)).collect();
            let mut reversed = workouts.clone();
            reversed.reverse();

            let expected: u64 = durations.iter().map(|d| u64::from(*d)).sum();
            prop_assert_eq!(total_duration(&workouts), expected);
            prop_assert_eq!(total_duration(&reversed), expected);
        }

        #[test]
        fn test_extremes_hold_max_and_min(
            offsets in proptest::collection::vec((0i64..14, 1u32..120), 0..30)
        ) {
            let workouts: Vec<Workout> = offsets
                .iter()
                .map(|(offset, minutes)| {
                    workout_on(monday() + chrono::Duration::days(*offset), WorkoutType::Cardio, &[("Run", *minutes)])
                })
                .collect();
            let activity = activity_by_weekday(&workouts, &[]);
            let max = *activity.minutes.iter().max().unwrap();
            let min = *activity.minutes.iter().min().unwrap();
            prop_assert_eq!(activity.minutes_on(activity.most_active), max);
            prop_assert_eq!(activity.minutes_on(activity.least_active), min);
        }
    }

    #[test]
    fn test_summary_display_rows() {
        let logged = vec![
            workout_on(monday(), WorkoutType::Cardio, &[("Run", 30)]),
            workout_on(monday(), WorkoutType::Cardio, &[("Row", 20)]),
        ];
        let rows = WorkoutSummary::compute(&[], &logged, &[]).display_rows();
        assert_eq!(rows.len(), 8);
        assert!(rows.contains(&("Most frequent type", "Cardio".to_string())));
        assert!(rows.contains(&("Average workout time", "25.0 min".to_string())));

        let empty = WorkoutSummary::compute(&[], &[], &[]).display_rows();
        assert!(empty.contains(&("Most frequent type", "-".to_string())));
        assert!(empty.contains(&("Favorite exercise", "-".to_string())));
    }
}
