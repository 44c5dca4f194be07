//! Chat-completion client for workout generation and training insights
//!
//! Talks to an OpenAI-compatible `/chat/completions` endpoint (Groq by
//! default). The model is asked for a JSON object; the returned content is
//! handed to [`crate::adapter`] which decides whether it is usable.

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::adapter::{parse_generated_workout, parse_recommendations};
use crate::config::AiSettings;
use crate::error::{AiError, FitTrackError, Result, ValidationError};
use crate::models::{Goal, Workout, WorkoutType};
use crate::stats;

// ---------------------------------------------------------------------------
// Request parameters
// ---------------------------------------------------------------------------

/// What the user asks a generated workout to look like
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRequest {
    pub workout_type: WorkoutType,
    pub muscle_groups: Option<String>,
    pub cardio_method: Option<String>,
    pub preferred_exercises: String,
    pub environment: String,
    pub number_of_exercises: u32,
    /// Minutes
    pub duration: u32,
}

impl WorkoutRequest {
    pub const EXERCISES_RANGE: (u32, u32) = (1, 20);
    pub const DURATION_RANGE: (u32, u32) = (5, 180);

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        for (field, value, (min, max)) in [
            ("number of exercises", self.number_of_exercises, Self::EXERCISES_RANGE),
            ("duration", self.duration, Self::DURATION_RANGE),
        ] {
            if value < min || value > max {
                return Err(ValidationError::OutOfRange {
                    field: field.to_string(),
                    min: i64::from(min),
                    max: i64::from(max),
                    value: i64::from(value),
                });
            }
        }
        Ok(())
    }
}

/// Aggregates sent along with an insight request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingSnapshot {
    pub average_minutes: f64,
    pub total_minutes: u64,
    pub workouts_by_type: Vec<(WorkoutType, u64)>,
}

impl TrainingSnapshot {
    pub fn from_log(completed: &[Workout]) -> Self {
        Self {
            average_minutes: stats::average_duration(completed),
            total_minutes: stats::total_duration(completed),
            workouts_by_type: stats::workout_type_counts(completed),
        }
    }

    fn describe(&self) -> String {
        let by_type = self
            .workouts_by_type
            .iter()
            .map(|(t, n)| format!("{}: {}", t, n))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Average workout time: {:.1} minutes. Total workout time: {} minutes. Workouts by type: {}",
            self.average_minutes, self.total_minutes, by_type
        )
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

fn workout_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": { "type": "string", "enum": ["Cardio", "Strength", "Flexibility"] },
            "duration": { "type": "number" },
            "exercises": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "duration": { "type": "number" },
                        "sets": { "type": "number", "optional": true },
                        "reps": { "type": "array", "items": { "type": "number" }, "optional": true },
                        "weights": { "type": "array", "items": { "type": "number" }, "optional": true }
                    },
                    "required": ["name", "duration"]
                }
            }
        },
        "required": ["type", "duration", "exercises"]
    })
}

fn recommendations_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "recommendations": {
                "type": "array",
                "items": { "type": "string" },
                "length": 5
            }
        },
        "required": ["recommendations"]
    })
}

pub fn workout_prompt(request: &WorkoutRequest) -> String {
    let mut lines = vec![
        "Generate a workout plan based on the following user input. Ensure the total duration of all \
         exercises matches the requested duration, the number of exercises matches the requested number, \
         aim for 2 exercises per muscle group, and include a realistic weight for each set based on the exercise:"
            .to_string(),
        format!("- Workout Type: {}", request.workout_type),
    ];
    if let Some(groups) = &request.muscle_groups {
        lines.push(format!("- Muscle Groups: {}", groups));
    }
    if let Some(method) = &request.cardio_method {
        lines.push(format!("- Cardio Method: {}", method));
    }
    lines.push(format!("- Preferred Exercises: {}", request.preferred_exercises));
    lines.push(format!("- Environment: {}", request.environment));
    lines.push(format!("- Number of Exercises: {}", request.number_of_exercises));
    lines.push(format!("- Duration: {} minutes", request.duration));
    lines.push(String::new());
    lines.push(format!(
        "Create a workout plan that fits these criteria. The response should be a JSON object that matches the following schema:\n{}",
        pretty(&workout_schema())
    ));
    lines.join("\n")
}

pub fn insights_prompt(snapshot: &TrainingSnapshot, goals: &[Goal]) -> String {
    let goals_json = serde_json::to_string(goals).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Generate insights and recommendations based on the user's training data and formulate the response \
         as if you were talking to the user. For example, in strength training the latest studies have shown \
         that training each muscle group twice per week is beneficial. If the input for something is empty, \
         ignore that part and do not request more information.\n\
         Training data: {}\nUser goals: {}\n\n\
         The response should be a JSON object that matches the following schema:\n{}",
        snapshot.describe(),
        goals_json,
        pretty(&recommendations_schema())
    )
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AiClient {
    client: Client,
    settings: AiSettings,
    api_key: String,
}

impl AiClient {
    /// Build a client, reading the API key from the configured environment variable
    pub fn from_settings(settings: &AiSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AiError::MissingApiKey {
                env_var: settings.api_key_env.clone(),
            })?;
        Self::with_api_key(settings, api_key)
    }

    pub fn with_api_key(settings: &AiSettings, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AiError::Request(e.to_string()))?;
        Ok(Self {
            client,
            settings: settings.clone(),
            api_key: api_key.into(),
        })
    }

    /// Send one system prompt and return the message content
    pub async fn complete(&self, prompt: &str, operation: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "system",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            stream: false,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let url = format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'));
        debug!(%url, model = %self.settings.model, operation, "Sending chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AiError::Request(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| AiError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                FitTrackError::from(AiError::EmptyResponse {
                    operation: operation.to_string(),
                })
            })
    }

    /// Generate a workout dated `today` matching the request
    pub async fn generate_workout(&self, request: &WorkoutRequest, today: NaiveDate) -> Result<Workout> {
        request.validate()?;
        let content = self
            .complete(&workout_prompt(request), "generate workout")
            .await?;
        let workout = parse_generated_workout(&extract_json(&content), today)?;
        info!(
            workout_id = %workout.id,
            exercises = workout.exercises.len(),
            "Workout generated"
        );
        Ok(workout)
    }

    /// Generate recommendations from the workout log and current goals
    pub async fn generate_recommendations(
        &self,
        snapshot: &TrainingSnapshot,
        goals: &[Goal],
    ) -> Result<Vec<String>> {
        let content = self
            .complete(&insights_prompt(snapshot, goals), "generate suggestions")
            .await?;
        let recommendations = parse_recommendations(&extract_json(&content))?;
        info!(count = recommendations.len(), "Recommendations generated");
        Ok(recommendations)
    }
}

/// Strip markdown fences or prose around a JSON object. Falls back to the input.
pub fn extract_json(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        if let Some(end) = after[body_start..].find("```") {
            return after[body_start..body_start + end].trim().to_string();
        }
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> WorkoutRequest {
        WorkoutRequest {
            workout_type: WorkoutType::Strength,
            muscle_groups: Some("legs".to_string()),
            cardio_method: None,
            preferred_exercises: "squats".to_string(),
            environment: "gym".to_string(),
            number_of_exercises: 4,
            duration: 45,
        }
    }

    #[test]
    fn test_request_validation() {
        assert!(request().validate().is_ok());

        let mut too_long = request();
        too_long.duration = 200;
        assert!(matches!(
            too_long.validate(),
            Err(ValidationError::OutOfRange { value: 200, .. })
        ));

        let mut no_exercises = request();
        no_exercises.number_of_exercises = 0;
        assert!(no_exercises.validate().is_err());
    }

    #[test]
    fn test_workout_prompt_embeds_parameters_and_schema() {
        let prompt = workout_prompt(&request());
        assert!(prompt.contains("- Workout Type: Strength"));
        assert!(prompt.contains("- Muscle Groups: legs"));
        assert!(!prompt.contains("Cardio Method"));
        assert!(prompt.contains("- Duration: 45 minutes"));
        assert!(prompt.contains("\"required\""));
    }

    #[test]
    fn test_insights_prompt_describes_type_counts() {
        let snapshot = TrainingSnapshot {
            average_minutes: 30.0,
            total_minutes: 90,
            workouts_by_type: vec![(WorkoutType::Cardio, 2), (WorkoutType::Strength, 1)],
        };
        let prompt = insights_prompt(&snapshot, &[]);
        assert!(prompt.contains("Workouts by type: Cardio: 2, Strength: 1"));
        assert!(prompt.contains("User goals: []"));
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(extract_json(r#"  {"a":1} "#), r#"{"a":1}"#);
        assert_eq!(extract_json("```json\n{\"a\":1}\n```"), r#"{"a":1}"#);
        assert_eq!(extract_json(r#"Here: {"a":1} done"#), r#"{"a":1}"#);
        assert_eq!(extract_json("no json"), "no json");
    }
}
