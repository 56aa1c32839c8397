//! End-to-end route tests against the in-memory repository.

mod support;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use support::weekly_definition;
use trainer_backend::config::ServerConfig;
use trainer_backend::db::LocalRepository;
use trainer_backend::http::{create_router, AppState};
use trainer_backend::scheduler::{WindowBound, MAX_DURATION_MONTHS};

fn app_with(repo: LocalRepository, config: ServerConfig) -> Router {
    create_router(AppState::with_config(Arc::new(repo), config))
}

fn app() -> Router {
    app_with(LocalRepository::new(), ServerConfig::default())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_reports_repository() {
    let repo = LocalRepository::new();
    let app = app_with(repo.clone(), ServerConfig::default());

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");

    repo.set_healthy(false);
    let (_, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_exercise_lifecycle() {
    let app = app();

    let (status, id) = send(
        &app,
        "POST",
        "/exercise",
        Some(json!({"trainerId": "t1", "name": "Deadlift"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = id.as_str().unwrap().to_string();

    let (_, list) = send(&app, "GET", "/exercises?trainerId=t1", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["_id"], json!(id));

    let (_, other) = send(&app, "GET", "/exercises?trainerId=t2", None).await;
    assert_eq!(other, Value::Null);

    let (status, previous) = send(
        &app,
        "PUT",
        "/exercise",
        Some(json!({"id": id, "name": "Romanian deadlift"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(previous["name"], "Deadlift");

    let (_, list) = send(&app, "GET", "/exercises?trainerId=t1", None).await;
    assert_eq!(list[0]["name"], "Romanian deadlift");

    let uri = format!("/exercise?id={}", id);
    let (_, removed) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(removed["name"], "Romanian deadlift");
    let (_, removed_again) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(removed_again, Value::Null);
}

#[tokio::test]
async fn test_array_body_inserts_batch() {
    let app = app();

    let (status, ids) = send(
        &app,
        "POST",
        "/exercise",
        Some(json!([
            {"trainerId": "t1", "name": "Squat"},
            {"trainerId": "t1", "name": "Bench"},
            {"trainerId": "t1", "name": "Row"},
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids = ids.as_array().unwrap();
    assert_eq!(ids.len(), 3);

    let (_, list) = send(&app, "GET", "/exercises?trainerId=t1", None).await;
    let stored: Vec<(&Value, &Value)> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|e| (&e["_id"], &e["name"]))
        .collect();
    assert_eq!(
        stored,
        [
            (&ids[0], &json!("Squat")),
            (&ids[1], &json!("Bench")),
            (&ids[2], &json!("Row")),
        ]
    );

    let (status, body) = send(&app, "POST", "/club", Some(json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_user_batch_create_hashes_every_password() {
    let app = app();

    let (status, ids) = send(
        &app,
        "POST",
        "/user/create",
        Some(json!([
            {"email": "a@gym.test", "password": "first-pass"},
            {"email": "b@gym.test", "password": "second-pass"},
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids.as_array().unwrap().len(), 2);

    let (status, user) = send(
        &app,
        "POST",
        "/user/login",
        Some(json!({"email": "b@gym.test", "password": "second-pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["_id"], ids[1]);
    assert!(user.get("password").is_none());
}

#[tokio::test]
async fn test_update_without_id_is_bad_request() {
    let app = app();
    let (status, body) = send(&app, "PUT", "/club", Some(json!({"name": "North"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = send(&app, "PUT", "/club", Some(json!({"id": "missing", "name": "x"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_weights_sorted_by_date() {
    let app = app();
    for (date, kg) in [("2024-03-01", 81.0), ("2024-01-01", 84.5), ("2024-02-01", 82.8)] {
        send(
            &app,
            "POST",
            "/weight",
            Some(json!({"traineeId": "a", "date": date, "weight": kg})),
        )
        .await;
    }
    send(&app, "POST", "/weight", Some(json!({"traineeId": "b", "date": "2023-12-01"}))).await;

    let (_, weights) = send(&app, "GET", "/weights?traineeId=a", None).await;
    let dates: Vec<&str> = weights
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, ["2024-01-01", "2024-02-01", "2024-03-01"]);
}

#[tokio::test]
async fn test_training_schedule_is_expanded_on_create() {
    let app = app();
    let definition = weekly_definition();

    let (status, id) = send(
        &app,
        "POST",
        "/training-schedule",
        Some(json!({
            "traineeId": "trainee-1",
            "startFromDate": "2024-01-01",
            "schedule": definition,
            "duration": 1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(id.is_string());

    let (_, schedules) = send(&app, "GET", "/training-schedules?traineeId=trainee-1", None).await;
    let stored = &schedules[0];
    assert_eq!(stored["scheduleDOW"], definition);

    let sessions = stored["schedule"].as_array().unwrap();
    let mondays: Vec<&str> = sessions
        .iter()
        .filter(|s| s["time"] == "08:00")
        .map(|s| s["date"].as_str().unwrap())
        .collect();
    assert_eq!(
        mondays,
        ["2024-01-01", "2024-01-08", "2024-01-15", "2024-01-22", "2024-01-29"]
    );
    let thursdays: Vec<&str> = sessions
        .iter()
        .filter(|s| s["time"] == "18:30")
        .map(|s| s["date"].as_str().unwrap())
        .collect();
    assert_eq!(
        thursdays,
        ["2024-01-04", "2024-01-11", "2024-01-18", "2024-01-25"]
    );
    // Slot-major order: all Monday sessions come before the Thursday ones.
    assert_eq!(sessions[0]["date"], "2024-01-01");
    assert_eq!(sessions[5]["date"], "2024-01-04");
}

#[tokio::test]
async fn test_training_schedule_update_reexpands() {
    let config = ServerConfig {
        schedule_window: WindowBound::TotalSpan,
        ..Default::default()
    };
    let app = app_with(LocalRepository::new(), config);

    let (_, id) = send(
        &app,
        "POST",
        "/training-schedule",
        Some(json!({
            "traineeId": "t",
            "startFromDate": "2024-01-01",
            "schedule": {"0": {"time": "08:00", "exercises": []}},
            "duration": 1,
        })),
    )
    .await;

    let (status, previous) = send(
        &app,
        "PUT",
        "/training-schedule",
        Some(json!({
            "id": id,
            "startFromDate": "2024-01-01",
            "schedule": {"0": {"time": "08:00", "exercises": []}},
            "duration": "2",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(previous["schedule"].as_array().unwrap().len(), 5);

    let (_, schedules) = send(&app, "GET", "/training-schedules?traineeId=t", None).await;
    // Total-span windows overlap: the February iteration runs on into March.
    assert_eq!(schedules[0]["schedule"].as_array().unwrap().len(), 13);
    assert_eq!(schedules[0]["duration"], "2");
}

#[tokio::test]
async fn test_invalid_schedule_is_rejected() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/training-schedule",
        Some(json!({
            "startFromDate": "2024-01-01",
            "schedule": {"2": {"time": "25:00"}},
            "duration": 1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_SCHEDULE");

    let (status, _) = send(
        &app,
        "POST",
        "/training-schedule",
        Some(json!({"startFromDate": "2024-01-01", "schedule": {}, "duration": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = send(&app, "GET", "/training-schedules?traineeId=x", None).await;
    assert_eq!(listed, Value::Null);
}

#[tokio::test]
async fn test_duration_over_limit_is_rejected() {
    let app = app_with(
        LocalRepository::new(),
        ServerConfig {
            schedule_window: WindowBound::TotalSpan,
            ..Default::default()
        },
    );

    for duration in [json!(MAX_DURATION_MONTHS + 1), json!("1000000")] {
        let (status, body) = send(
            &app,
            "POST",
            "/training-schedule",
            Some(json!({
                "traineeId": "t",
                "startFromDate": "2024-01-01",
                "schedule": {"0": {"time": "08:00", "exercises": []}},
                "duration": duration,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SCHEDULE");
    }

    let (status, _) = send(
        &app,
        "POST",
        "/training-schedule",
        Some(json!({
            "traineeId": "t",
            "startFromDate": "2024-01-01",
            "schedule": {"0": {"time": "08:00", "exercises": []}},
            "duration": MAX_DURATION_MONTHS,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_user_password_login_never_exposes_hash() {
    let app = app();

    let (status, id) = send(
        &app,
        "POST",
        "/user/create",
        Some(json!({"email": "coach@gym.test", "password": "lift-heavy", "role": "trainer"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = id.as_str().unwrap().to_string();

    let (_, user) = send(&app, "GET", &format!("/user/get?id={}", id), None).await;
    assert_eq!(user["role"], "trainer");
    assert!(user.get("passwordHash").is_none());
    assert!(user.get("password").is_none());

    let (status, logged_in) = send(
        &app,
        "POST",
        "/user/login",
        Some(json!({"email": "coach@gym.test", "password": "lift-heavy"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logged_in["_id"], json!(id));
    assert!(logged_in.get("passwordHash").is_none());

    let (status, body) = send(
        &app,
        "POST",
        "/user/login",
        Some(json!({"email": "coach@gym.test", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_user_lookup_and_trainer_assignment() {
    let app = app();

    let (_, trainee_id) = send(
        &app,
        "POST",
        "/user/create",
        Some(json!({"id": "app-user-7", "googleId": "g-7", "name": "Sam", "role": "trainee"})),
    )
    .await;

    let (_, by_google) = send(&app, "GET", "/user/get?googleId=g-7&id=nope", None).await;
    assert_eq!(by_google["_id"], trainee_id);

    let (_, nobody) = send(&app, "GET", "/user/get?googleId=g-unknown", None).await;
    assert_eq!(nobody, Value::Null);

    let (_, previous) = send(
        &app,
        "POST",
        "/user/update-user-trainer-id",
        Some(json!({"id": "app-user-7", "trainerId": "coach-1"})),
    )
    .await;
    assert_eq!(previous["name"], "Sam");
    assert!(previous.get("trainerId").is_none());

    let (_, trainees) = send(&app, "GET", "/trainees?trainerId=coach-1&role=trainee", None).await;
    assert_eq!(trainees.as_array().unwrap().len(), 1);
    assert_eq!(trainees[0]["trainerId"], "coach-1");

    let (_, previous) = send(
        &app,
        "PUT",
        "/user",
        Some(json!({"id": trainee_id, "name": "Samantha"})),
    )
    .await;
    assert_eq!(previous["name"], "Sam");

    let uri = format!("/trainee?id={}", trainee_id.as_str().unwrap());
    let (_, removed) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(removed["name"], "Samantha");
    let (_, trainees) = send(&app, "GET", "/trainees?trainerId=coach-1", None).await;
    assert_eq!(trainees, Value::Null);
}

#[tokio::test]
async fn test_google_oauth_unconfigured_is_unavailable() {
    let app = app();
    let (status, body) = send(&app, "POST", "/oauth/google", Some(json!({"code": "abc"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_repository_failure_maps_to_server_error() {
    let repo = LocalRepository::new();
    repo.set_healthy(false);
    let app = app_with(repo, ServerConfig::default());

    let (status, body) = send(&app, "GET", "/clubs?trainerId=t", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "REPOSITORY_ERROR");
    assert!(body["details"].as_str().unwrap().contains("collection=clubs"));
}
