use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fittrack::ai::{AiClient, WorkoutRequest};
use fittrack::config::AiSettings;
use fittrack::error::{AiError, FitTrackError};
use fittrack::models::{Exercise, WorkoutDraft, ExerciseDraft, WorkoutType};
use fittrack::storage::{MemoryStorage, Store};
use fittrack::tracker::{Insights, PersistencePolicy, Tracker};

fn settings(server: &MockServer) -> AiSettings {
    AiSettings {
        base_url: server.uri(),
        timeout_secs: 5,
        ..AiSettings::default()
    }
}

fn client(server: &MockServer) -> AiClient {
    AiClient::with_api_key(&settings(server), "test-key").unwrap()
}

/// Chat-completion envelope around `content`
fn completion(content: Value) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn request() -> WorkoutRequest {
    WorkoutRequest {
        workout_type: WorkoutType::Strength,
        muscle_groups: Some("legs".to_string()),
        cardio_method: None,
        preferred_exercises: "squats".to_string(),
        environment: "gym".to_string(),
        number_of_exercises: 2,
        duration: 30,
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()
}

#[tokio::test]
async fn test_generate_workout_success() {
    let server = MockServer::start().await;
    let payload = json!({
        "type": "Strength",
        "duration": 30,
        "exercises": [
            {"name": "Squat", "duration": 20, "sets": 3, "reps": [8, 8, 6], "weights": [60, 60, 70]},
            {"name": "Walk", "duration": 10}
        ]
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "mixtral-8x7b-32768",
            "stream": false,
            "max_tokens": 1000,
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!(payload.to_string()))))
        .expect(1)
        .mount(&server)
        .await;

    let workout = client(&server).generate_workout(&request(), today()).await.unwrap();

    assert_eq!(workout.workout_type, WorkoutType::Strength);
    assert_eq!(workout.date, today());
    assert_eq!(workout.duration, 30);
    assert_eq!(
        workout.exercises[0],
        Exercise::strength("Squat", 20, 3, vec![8, 8, 6], vec![60.0, 60.0, 70.0])
    );
    assert_eq!(workout.exercises[1], Exercise::cardio("Walk", 10));
}

#[tokio::test]
async fn test_fenced_content_is_accepted() {
    let server = MockServer::start().await;
    let content = "```json\n{\"recommendations\": [\"Train legs twice a week\"]}\n```";

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!(content))))
        .mount(&server)
        .await;

    let snapshot = fittrack::ai::TrainingSnapshot::from_log(&[]);
    let recs = client(&server)
        .generate_recommendations(&snapshot, &[])
        .await
        .unwrap();
    assert_eq!(recs, vec!["Train legs twice a week"]);
}

#[tokio::test]
async fn test_empty_content_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!(""))))
        .mount(&server)
        .await;

    let err = client(&server)
        .generate_workout(&request(), today())
        .await
        .unwrap_err();
    assert!(matches!(err, FitTrackError::Ai(AiError::EmptyResponse { .. })));
    assert!(err.is_retryable());
    assert_eq!(
        err.user_message(),
        "Failed to generate workout: empty response, try again."
    );
}

#[tokio::test]
async fn test_http_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "message": "model overloaded" }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .generate_workout(&request(), today())
        .await
        .unwrap_err();
    match err {
        FitTrackError::Ai(AiError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "model overloaded");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_payload_missing_required_field() {
    let server = MockServer::start().await;
    let payload = json!({ "type": "Cardio", "exercises": [] });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!(payload.to_string()))))
        .mount(&server)
        .await;

    let err = client(&server)
        .generate_workout(&request(), today())
        .await
        .unwrap_err();
    assert!(matches!(err, FitTrackError::Adapter(_)));
}

#[tokio::test]
async fn test_invalid_request_never_reaches_the_service() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut bad = request();
    bad.number_of_exercises = 25;
    let err = client(&server).generate_workout(&bad, today()).await.unwrap_err();
    assert!(matches!(err, FitTrackError::Validation(_)));
}

#[tokio::test]
async fn test_tracker_insights_use_the_cache() {
    let server = MockServer::start().await;
    let payload = json!({ "recommendations": ["Add a rest day", "Stretch after runs"] });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!(payload.to_string()))))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut tracker =
        Tracker::open(Store::new(MemoryStorage::new()), PersistencePolicy::Strict).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 6, 12, 9, 0, 0).unwrap();

    // no history, no request
    assert_eq!(
        tracker.insights(|| Ok(client.clone()), now, false).await.unwrap(),
        Insights::NoHistory
    );

    let planned = tracker
        .add_workout(
            WorkoutDraft {
                date: today(),
                workout_type: WorkoutType::Cardio,
                exercises: vec!["Run:30".parse::<ExerciseDraft>().unwrap()],
            },
            today(),
        )
        .unwrap();
    tracker.complete_workout(&planned.id, today()).unwrap();

    let first = tracker.insights(|| Ok(client.clone()), now, false).await.unwrap();
    assert!(matches!(first, Insights::Generated(ref r) if r.len() == 2));

    let later = now + chrono::Duration::hours(3);
    let second = tracker.insights(|| Ok(client.clone()), later, false).await.unwrap();
    assert_eq!(second, Insights::Cached(first.recommendations().to_vec()));

    // stale after a day
    let next_day = now + chrono::Duration::hours(25);
    let third = tracker.insights(|| Ok(client.clone()), next_day, false).await.unwrap();
    assert!(matches!(third, Insights::Generated(_)));
}
