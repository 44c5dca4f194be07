//! Adapters from AI-generated JSON payloads to typed entities
//!
//! The payloads are loosely typed: numbers may arrive as floats and
//! strength details may be partial. Required fields are checked before any
//! conversion so a missing field is reported as such rather than as a
//! generic decode failure.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AdapterError;
use crate::models::{Exercise, Workout, WorkoutType};

type Object = Map<String, Value>;

/// Parse a generated workout payload `{type, duration, exercises}` into a workout dated `today`
pub fn parse_generated_workout(payload: &str, today: NaiveDate) -> Result<Workout, AdapterError> {
    let root = parse_object(payload)?;

    let workout_type = parse_workout_type(require(&root, "type", "type")?)?;
    let duration = parse_minutes(require(&root, "duration", "duration")?, "duration")?;
    let items = require(&root, "exercises", "exercises")?
        .as_array()
        .ok_or_else(|| invalid("exercises", "expected an array"))?;

    let exercises = items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_exercise(item, i))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Workout {
        id: Uuid::new_v4().to_string(),
        date: today,
        workout_type,
        duration,
        exercises,
    })
}

/// Parse an insight payload `{recommendations: [string]}`
pub fn parse_recommendations(payload: &str) -> Result<Vec<String>, AdapterError> {
    let root = parse_object(payload)?;
    let items = require(&root, "recommendations", "recommendations")?
        .as_array()
        .ok_or_else(|| invalid("recommendations", "expected an array"))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str()
                .map(|s| s.trim().to_string())
                .ok_or_else(|| invalid(&format!("recommendations[{}]", i), "expected a string"))
        })
        .collect()
}

fn parse_object(payload: &str) -> Result<Object, AdapterError> {
    let value: Value = serde_json::from_str(payload).map_err(|e| AdapterError::InvalidJson {
        reason: e.to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AdapterError::NotAnObject {
            found: json_kind(&other).to_string(),
        }),
    }
}

fn parse_exercise(item: &Value, index: usize) -> Result<Exercise, AdapterError> {
    let path = format!("exercises[{}]", index);
    let obj = item
        .as_object()
        .ok_or_else(|| invalid(&path, "expected an object"))?;

    let name = require(obj, "name", &format!("{}.name", path))?
        .as_str()
        .ok_or_else(|| invalid(&format!("{}.name", path), "expected a string"))?
        .to_string();
    let duration = parse_minutes(
        require(obj, "duration", &format!("{}.duration", path))?,
        &format!("{}.duration", path),
    )?;

    let sets = present(obj, "sets");
    let reps = present(obj, "reps");
    let (Some(sets), Some(reps)) = (sets, reps) else {
        return Ok(Exercise::Cardio { name, duration });
    };

    let sets_path = format!("{}.sets", path);
    let sets = parse_count(sets, &sets_path)?;
    if sets == 0 {
        return Err(invalid(&sets_path, "must be at least 1"));
    }
    let reps_path = format!("{}.reps", path);
    let reps = parse_array(reps, &reps_path, parse_count)?;
    if reps.len() != sets as usize {
        return Err(invalid(
            &reps_path,
            &format!("{} entries for {} sets", reps.len(), sets),
        ));
    }
    let weights_path = format!("{}.weights", path);
    let weights = match present(obj, "weights") {
        Some(w) => parse_array(w, &weights_path, parse_weight)?,
        None => Vec::new(),
    };
    if !weights.is_empty() && weights.len() != sets as usize {
        return Err(invalid(
            &weights_path,
            &format!("{} entries for {} sets", weights.len(), sets),
        ));
    }

    Ok(Exercise::Strength {
        name,
        duration,
        sets,
        reps,
        weights,
    })
}

fn parse_workout_type(value: &Value) -> Result<WorkoutType, AdapterError> {
    let label = value
        .as_str()
        .ok_or_else(|| invalid("type", "expected a string"))?;
    label.parse().map_err(|e: String| invalid("type", &e))
}

fn parse_minutes(value: &Value, field: &str) -> Result<u32, AdapterError> {
    parse_count(value, field)
}

/// Non-negative whole number; floats are rounded
fn parse_count(value: &Value, field: &str) -> Result<u32, AdapterError> {
    let number = value
        .as_f64()
        .ok_or_else(|| invalid(field, "expected a number"))?;
    if !number.is_finite() || number < 0.0 || number > f64::from(u32::MAX) {
        return Err(invalid(field, &format!("{} is out of range", number)));
    }
    Ok(number.round() as u32)
}

fn parse_weight(value: &Value, field: &str) -> Result<f64, AdapterError> {
    let number = value
        .as_f64()
        .ok_or_else(|| invalid(field, "expected a number"))?;
    if number < 0.0 {
        return Err(invalid(field, &format!("{} is negative", number)));
    }
    Ok(number)
}

fn parse_array<T>(
    value: &Value,
    field: &str,
    item: fn(&Value, &str) -> Result<T, AdapterError>,
) -> Result<Vec<T>, AdapterError> {
    value
        .as_array()
        .ok_or_else(|| invalid(field, "expected an array"))?
        .iter()
        .enumerate()
        .map(|(i, v)| item(v, &format!("{}[{}]", field, i)))
        .collect()
}

/// Field value, treating `null` as absent
fn present<'a>(obj: &'a Object, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn require<'a>(obj: &'a Object, key: &str, path: &str) -> Result<&'a Value, AdapterError> {
    present(obj, key).ok_or_else(|| AdapterError::MissingField {
        field: path.to_string(),
    })
}

fn invalid(field: &str, reason: &str) -> AdapterError {
    AdapterError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
