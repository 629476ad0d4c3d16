use axum::http::{Request, StatusCode};
use axum::{Router, body::Body};
use serde_json::{Value, json};
use tower::ServiceExt;

use api::routes::routes;
use db::models::{course, user};
use db::test_utils::setup_test_db;
use util::state::AppState;

/// Default browser headers for requests; the device fingerprint is derived
/// from these, so two requests with the same set act as the same device.
pub const DEVICE_A: &str = "Mozilla/5.0 (device-a)";
pub const DEVICE_B: &str = "Mozilla/5.0 (device-b)";

pub async fn make_test_app() -> (Router, AppState) {
    let db = setup_test_db().await;
    let state = AppState::new(db);
    let app = Router::new()
        .nest("/api", routes())
        .with_state(state.clone());
    (app, state)
}

/// POSTs an action body to `uri` from the given device and returns the
/// status plus the parsed envelope.
pub async fn post_json_as(
    app: &Router,
    uri: &str,
    user_agent: &str,
    body: Value,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("user-agent", user_agent)
        .header("accept-language", "en-US")
        .header("accept-encoding", "gzip")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_json_as(app, uri, DEVICE_A, body).await
}

/// Seeds a lecturer with one course straight through the models and logs
/// them in, returning (token, course_id).
pub async fn lecturer_with_course(app: &Router, state: &AppState) -> (String, i64) {
    let (_, lecturer) = user::Model::create_lecturer(
        state.db(),
        user::CreateLecturer {
            full_name: "Grace Hopper".to_string(),
            email: "grace@uni.test".to_string(),
            employee_id: "EMP001".to_string(),
            department: "Computer Science".to_string(),
            phone: None,
            password: "password123".to_string(),
        },
    )
    .await
    .expect("failed to seed lecturer");

    let course = course::Model::create(state.db(), "COS101", "Intro to CS", lecturer.id)
        .await
        .expect("failed to seed course");

    let (status, body) = post_json(
        app,
        "/api/auth",
        json!({ "action": "login", "email": "grace@uni.test", "password": "password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "lecturer login failed: {body}");

    (body["token"].as_str().unwrap().to_string(), course.id)
}

/// Registers and logs a student in from the given device, returning the
/// token.
pub async fn student_token(app: &Router, index_number: &str, device: &str) -> String {
    let email = format!("{index_number}@student.test");
    let (status, body) = post_json_as(
        app,
        "/api/auth",
        device,
        json!({
            "action": "register",
            "email": email,
            "password": "password123",
            "indexNumber": index_number,
            "fullName": format!("Student {index_number}"),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "registration failed: {body}");

    let (status, body) = post_json_as(
        app,
        "/api/auth",
        device,
        json!({ "action": "login", "email": email, "password": "password123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "student login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

/// Opens a session through the API and returns its id.
pub async fn open_session(
    app: &Router,
    lecturer_token: &str,
    course_id: i64,
    latitude: f64,
    longitude: f64,
    radius_meters: f64,
) -> i64 {
    let (status, body) = post_json(
        app,
        "/api/attendance",
        json!({
            "action": "create-session",
            "token": lecturer_token,
            "courseId": course_id,
            "latitude": latitude,
            "longitude": longitude,
            "radiusMeters": radius_meters,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create-session failed: {body}");
    body["sessionId"].as_i64().unwrap()
}
