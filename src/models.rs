use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

/// Goal categories offered when creating a goal. Stored goals keep a free-form label.
pub const GOAL_CATEGORIES: [&str; 3] = ["Weight Loss", "Endurance", "Strength"];

/// Upper bound for a single exercise, one full day
pub const MAX_EXERCISE_MINUTES: u32 = 24 * 60;

/// Workout types for categorizing training sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkoutType {
    Cardio,
    Strength,
    Flexibility,
}

impl WorkoutType {
    pub const ALL: [WorkoutType; 3] = [
        WorkoutType::Cardio,
        WorkoutType::Strength,
        WorkoutType::Flexibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutType::Cardio => "Cardio",
            WorkoutType::Strength => "Strength",
            WorkoutType::Flexibility => "Flexibility",
        }
    }
}

impl fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkoutType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cardio" => Ok(WorkoutType::Cardio),
            "strength" => Ok(WorkoutType::Strength),
            "flexibility" => Ok(WorkoutType::Flexibility),
            _ => Err(format!("Invalid workout type: {}", s)),
        }
    }
}

/// A single exercise within a workout.
///
/// The variant is explicit: a strength exercise with empty reps/weights is
/// still a strength exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Exercise {
    Cardio {
        name: String,
        /// Minutes
        duration: u32,
    },
    Strength {
        name: String,
        /// Minutes
        duration: u32,
        sets: u32,
        /// Reps per set, aligned by index to sets
        reps: Vec<u32>,
        /// Weight per set, aligned by index to sets
        weights: Vec<f64>,
    },
}

/// One row of a strength exercise breakdown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetEntry {
    /// 1-based set number
    pub set: u32,
    pub reps: u32,
    pub weight: f64,
}

impl Exercise {
    pub fn cardio(name: impl Into<String>, duration: u32) -> Self {
        Exercise::Cardio {
            name: name.into(),
            duration,
        }
    }

    pub fn strength(
        name: impl Into<String>,
        duration: u32,
        sets: u32,
        reps: Vec<u32>,
        weights: Vec<f64>,
    ) -> Self {
        Exercise::Strength {
            name: name.into(),
            duration,
            sets,
            reps,
            weights,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Exercise::Cardio { name, .. } | Exercise::Strength { name, .. } => name,
        }
    }

    pub fn duration(&self) -> u32 {
        match self {
            Exercise::Cardio { duration, .. } | Exercise::Strength { duration, .. } => *duration,
        }
    }

    pub fn is_strength(&self) -> bool {
        matches!(self, Exercise::Strength { .. })
    }

    /// Per-set breakdown; missing reps or weights read as zero.
    pub fn set_entries(&self) -> Vec<SetEntry> {
        match self {
            Exercise::Cardio { .. } => Vec::new(),
            Exercise::Strength {
                sets, reps, weights, ..
            } => (0..*sets)
                .map(|i| SetEntry {
                    set: i + 1,
                    reps: reps.get(i as usize).copied().unwrap_or(0),
                    weight: weights.get(i as usize).copied().unwrap_or(0.0),
                })
                .collect(),
        }
    }
}

/// Core workout record. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    /// Unique identifier for the workout
    pub id: String,

    /// Date of the workout
    pub date: NaiveDate,

    /// Type/category of the workout
    #[serde(rename = "type")]
    pub workout_type: WorkoutType,

    /// Duration in minutes, the sum of exercise durations at creation
    pub duration: u32,

    /// Exercises in the order they are performed
    pub exercises: Vec<Exercise>,
}

impl Workout {
    /// Create a workout with a fresh id, deriving duration from the exercises
    pub fn new(date: NaiveDate, workout_type: WorkoutType, exercises: Vec<Exercise>) -> Self {
        let duration = exercises
            .iter()
            .fold(0u32, |total, e| total.saturating_add(e.duration()));
        Self {
            id: Uuid::new_v4().to_string(),
            date,
            workout_type,
            duration,
            exercises,
        }
    }

    /// Sum of exercise durations, which may drift from `duration` for generated workouts
    pub fn exercise_minutes(&self) -> u32 {
        self.exercises
            .iter()
            .fold(0u32, |total, e| total.saturating_add(e.duration()))
    }
}

/// An active goal tracked by progress percentage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,

    /// Free-form category label
    #[serde(rename = "type")]
    pub goal_type: String,

    /// What the user wants to achieve
    pub target: String,

    pub deadline: NaiveDate,

    /// Percentage in 0..=100
    pub progress: u8,

    #[serde(default)]
    pub motivation: String,
}

/// A goal moved out of the active set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedGoal {
    pub id: String,

    #[serde(rename = "type")]
    pub goal_type: String,

    pub target: String,

    pub completed_date: NaiveDate,

    #[serde(default)]
    pub motivation: String,
}

impl Goal {
    pub fn into_completed(self, completed_date: NaiveDate) -> CompletedGoal {
        CompletedGoal {
            id: self.id,
            goal_type: self.goal_type,
            target: self.target,
            completed_date,
            motivation: self.motivation,
        }
    }
}

impl CompletedGoal {
    /// Back to the active set with progress reset
    pub fn into_active(self, deadline: NaiveDate) -> Goal {
        Goal {
            id: self.id,
            goal_type: self.goal_type,
            target: self.target,
            deadline,
            progress: 0,
            motivation: self.motivation,
        }
    }
}

/// Strength details entered for an exercise
#[derive(Debug, Clone, PartialEq)]
pub struct StrengthDraft {
    pub sets: u32,
    pub reps: Vec<u32>,
    pub weights: Vec<f64>,
}

/// User-entered exercise before validation
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseDraft {
    pub name: String,
    pub duration: u32,
    pub strength: Option<StrengthDraft>,
}

impl FromStr for ExerciseDraft {
    type Err = ValidationError;

    /// `NAME:MINUTES` or `NAME:MINUTES:REPS@WEIGHT,REPS@WEIGHT,...` (one entry per set)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparseable = |reason: &str| ValidationError::Unparseable {
            field: "exercise".to_string(),
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.splitn(3, ':');
        let name = parts.next().unwrap_or_default().trim().to_string();
        let duration = parts
            .next()
            .ok_or_else(|| unparseable("expected NAME:MINUTES"))?
            .trim()
            .parse::<u32>()
            .map_err(|_| unparseable("minutes must be a whole number"))?;

        let strength = match parts.next() {
            None => None,
            Some(sets) => {
                let mut reps = Vec::new();
                let mut weights = Vec::new();
                for entry in sets.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                    let (r, w) = entry.split_once('@').unwrap_or((entry, "0"));
                    reps.push(
                        r.trim()
                            .parse::<u32>()
                            .map_err(|_| unparseable("reps must be a whole number"))?,
                    );
                    weights.push(
                        w.trim()
                            .parse::<f64>()
                            .map_err(|_| unparseable("weight must be a number"))?,
                    );
                }
                Some(StrengthDraft {
                    sets: reps.len() as u32,
                    reps,
                    weights,
                })
            }
        };

        Ok(ExerciseDraft {
            name,
            duration,
            strength,
        })
    }
}

/// User-entered workout before validation
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutDraft {
    pub date: NaiveDate,
    pub workout_type: WorkoutType,
    pub exercises: Vec<ExerciseDraft>,
}

impl WorkoutDraft {
    /// Validate and build a workout. Exercises become strength exercises only
    /// for strength workouts; strength details on other types are dropped.
    pub fn build(self, today: NaiveDate) -> Result<Workout, ValidationError> {
        if self.date > today {
            return Err(ValidationError::InvalidDate {
                field: "date".to_string(),
                reason: format!("{} is in the future", self.date),
            });
        }
        if self.exercises.is_empty() {
            return Err(ValidationError::Required {
                field: "At least one exercise".to_string(),
            });
        }

        let mut exercises = Vec::with_capacity(self.exercises.len());
        for draft in self.exercises {
            if draft.name.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "Exercise name".to_string(),
                });
            }
            if !(1..=MAX_EXERCISE_MINUTES).contains(&draft.duration) {
                return Err(ValidationError::OutOfRange {
                    field: format!("{} duration", draft.name),
                    min: 1,
                    max: i64::from(MAX_EXERCISE_MINUTES),
                    value: i64::from(draft.duration),
                });
            }

            let exercise = match (self.workout_type, draft.strength) {
                (WorkoutType::Strength, Some(s)) => {
                    validate_sets(&draft.name, &s)?;
                    Exercise::strength(draft.name, draft.duration, s.sets, s.reps, s.weights)
                }
                (WorkoutType::Strength, None) => {
                    return Err(ValidationError::Required {
                        field: format!("Sets for {}", draft.name),
                    });
                }
                (_, _) => Exercise::cardio(draft.name, draft.duration),
            };
            exercises.push(exercise);
        }

        Ok(Workout::new(self.date, self.workout_type, exercises))
    }
}

fn validate_sets(name: &str, s: &StrengthDraft) -> Result<(), ValidationError> {
    if s.sets < 1 {
        return Err(ValidationError::OutOfRange {
            field: format!("{} sets", name),
            min: 1,
            max: i64::from(u32::MAX),
            value: i64::from(s.sets),
        });
    }
    for (field, actual) in [("reps", s.reps.len()), ("weights", s.weights.len())] {
        if actual != s.sets as usize {
            return Err(ValidationError::MisalignedSets {
                exercise: name.to_string(),
                field: field.to_string(),
                sets: s.sets,
                actual,
            });
        }
    }
    Ok(())
}

/// User-entered goal before validation
#[derive(Debug, Clone, PartialEq)]
pub struct GoalDraft {
    pub goal_type: String,
    pub target: String,
    pub deadline: NaiveDate,
    pub motivation: Option<String>,
}

impl GoalDraft {
    /// Validate and build an active goal with zero progress
    pub fn build(self, today: NaiveDate) -> Result<Goal, ValidationError> {
        if self.goal_type.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "Goal type".to_string(),
            });
        }
        if self.target.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "Target".to_string(),
            });
        }
        if self.deadline <= today {
            return Err(ValidationError::InvalidDate {
                field: "deadline".to_string(),
                reason: format!("{} is not after {}", self.deadline, today),
            });
        }

        Ok(Goal {
            id: Uuid::new_v4().to_string(),
            goal_type: self.goal_type,
            target: self.target,
            deadline: self.deadline,
            progress: 0,
            motivation: self.motivation.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_workout_duration_is_sum_of_exercises() {
        let workout = Workout::new(
            date(2024, 3, 4),
            WorkoutType::Cardio,
            vec![Exercise::cardio("Run", 20), Exercise::cardio("Row", 15)],
        );
        assert_eq!(workout.duration, 35);
        assert_eq!(workout.exercise_minutes(), 35);
        assert!(!workout.id.is_empty());
    }

    #[test]
    fn test_exercise_serializes_with_explicit_kind() {
        let cardio = serde_json::to_value(Exercise::cardio("Run", 20)).unwrap();
        assert_eq!(cardio["kind"], "cardio");
        assert!(cardio.get("sets").is_none());

        let strength =
            serde_json::to_value(Exercise::strength("Squat", 10, 1, vec![], vec![])).unwrap();
        assert_eq!(strength["kind"], "strength");
        let back: Exercise = serde_json::from_value(strength).unwrap();
        assert!(back.is_strength());
    }

    #[test]
    fn test_workout_uses_storage_field_names() {
        let workout = Workout::new(date(2024, 3, 4), WorkoutType::Flexibility, vec![]);
        let json = serde_json::to_value(&workout).unwrap();
        assert_eq!(json["type"], "Flexibility");
        assert_eq!(json["date"], "2024-03-04");

        let goal = CompletedGoal {
            id: "g".to_string(),
            goal_type: "Endurance".to_string(),
            target: "Run 5 miles".to_string(),
            completed_date: date(2024, 3, 4),
            motivation: String::new(),
        };
        let json = serde_json::to_value(&goal).unwrap();
        assert_eq!(json["completedDate"], "2024-03-04");
        assert_eq!(json["type"], "Endurance");
    }

    #[test]
    fn test_set_entries_pad_missing_values() {
        let squat = Exercise::strength("Squat", 10, 3, vec![8, 8], vec![60.0]);
        let entries = squat.set_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].reps, 8);
        assert_eq!(entries[1].weight, 0.0);
        assert_eq!(entries[2].reps, 0);
    }

    #[test]
    fn test_exercise_draft_parsing() {
        let run: ExerciseDraft = "Run:30".parse().unwrap();
        assert_eq!(run.name, "Run");
        assert_eq!(run.duration, 30);
        assert!(run.strength.is_none());

        let squat: ExerciseDraft = "Squat:12:8@60,8@60,6@70.5".parse().unwrap();
        let s = squat.strength.unwrap();
        assert_eq!(s.sets, 3);
        assert_eq!(s.reps, vec![8, 8, 6]);
        assert_eq!(s.weights, vec![60.0, 60.0, 70.5]);

        assert!("Run".parse::<ExerciseDraft>().is_err());
        assert!("Run:abc".parse::<ExerciseDraft>().is_err());
    }

    #[test]
    fn test_workout_draft_validation() {
        let today = date(2024, 3, 10);
        let draft = WorkoutDraft {
            date: today,
            workout_type: WorkoutType::Strength,
            exercises: vec!["Bench:10:5@80,5@80".parse().unwrap()],
        };
        let workout = draft.build(today).unwrap();
        assert_eq!(workout.duration, 10);
        assert!(workout.exercises[0].is_strength());

        let misaligned = WorkoutDraft {
            date: today,
            workout_type: WorkoutType::Strength,
            exercises: vec![ExerciseDraft {
                name: "Bench".to_string(),
                duration: 10,
                strength: Some(StrengthDraft {
                    sets: 3,
                    reps: vec![5, 5],
                    weights: vec![80.0, 80.0, 80.0],
                }),
            }],
        };
        assert!(matches!(
            misaligned.build(today),
            Err(ValidationError::MisalignedSets { actual: 2, .. })
        ));

        let future = WorkoutDraft {
            date: date(2024, 3, 11),
            workout_type: WorkoutType::Cardio,
            exercises: vec!["Run:30".parse().unwrap()],
        };
        assert!(matches!(
            future.build(today),
            Err(ValidationError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_exercise_minutes_are_bounded() {
        let today = date(2024, 3, 10);
        let huge = WorkoutDraft {
            date: today,
            workout_type: WorkoutType::Cardio,
            exercises: vec![
                "Run:4294967295".parse().unwrap(),
                "Row:1".parse().unwrap(),
            ],
        };
        assert!(matches!(
            huge.build(today),
            Err(ValidationError::OutOfRange { max: 1440, value: 4294967295, .. })
        ));

        let full_day = WorkoutDraft {
            date: today,
            workout_type: WorkoutType::Cardio,
            exercises: vec!["Walk:1440".parse().unwrap()],
        };
        assert_eq!(full_day.build(today).unwrap().duration, MAX_EXERCISE_MINUTES);

        // direct construction saturates instead of overflowing
        let saturated = Workout::new(
            today,
            WorkoutType::Cardio,
            vec![Exercise::cardio("Run", u32::MAX), Exercise::cardio("Row", 1)],
        );
        assert_eq!(saturated.duration, u32::MAX);
    }

    #[test]
    fn test_cardio_draft_drops_strength_details() {
        let today = date(2024, 3, 10);
        let draft = WorkoutDraft {
            date: today,
            workout_type: WorkoutType::Cardio,
            exercises: vec!["Bike:25:10@0".parse().unwrap()],
        };
        let workout = draft.build(today).unwrap();
        assert_eq!(workout.exercises[0], Exercise::cardio("Bike", 25));
    }

    #[test]
    fn test_goal_draft_validation() {
        let today = date(2024, 3, 10);
        let goal = GoalDraft {
            goal_type: "Endurance".to_string(),
            target: "Run 5 miles".to_string(),
            deadline: date(2024, 4, 1),
            motivation: None,
        }
        .build(today)
        .unwrap();
        assert_eq!(goal.progress, 0);
        assert_eq!(goal.motivation, "");

        let blank = GoalDraft {
            goal_type: "Endurance".to_string(),
            target: "  ".to_string(),
            deadline: date(2024, 4, 1),
            motivation: None,
        };
        assert!(matches!(
            blank.build(today),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_workout_type_parsing() {
        assert_eq!("cardio".parse::<WorkoutType>().unwrap(), WorkoutType::Cardio);
        assert_eq!("Strength".parse::<WorkoutType>().unwrap(), WorkoutType::Strength);
        assert!("yoga".parse::<WorkoutType>().is_err());
    }
}
