//! Integration tests for elearn-api endpoints
//!
//! Each test builds the real router over a fresh in-memory database and
//! drives it with `oneshot` requests.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use elearn_api::{build_router, AppState};
use elearn_common::db::init::init_memory_database;
use elearn_common::{ProgressPolicy, ReorderStrategy};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

const ADMIN: (&str, &str) = ("admin-1", "admin");
const TEACHER: (&str, &str) = ("teacher-1", "teacher");
const STUDENT: (&str, &str) = ("student-1", "student");
const OTHER_STUDENT: (&str, &str) = ("student-2", "student");

/// Test helper: app over an empty in-memory database
async fn setup_app(strategy: ReorderStrategy) -> Router {
    setup_app_with_pool(strategy).await.0
}

/// Test helper: app plus a handle on its pool for direct inspection
async fn setup_app_with_pool(strategy: ReorderStrategy) -> (Router, SqlitePool) {
    let pool = init_memory_database()
        .await
        .expect("Should create in-memory database");
    let app = build_router(AppState::new(pool.clone(), ProgressPolicy::default(), strategy));
    (app, pool)
}

/// Test helper: send a request as `caller`, returning status and JSON body
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    caller: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((user_id, role)) = caller {
        builder = builder.header("x-user-id", user_id).header("x-user-role", role);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn create_course(app: &Router) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/courses",
        Some(ADMIN),
        Some(json!({"title": "Rust Foundations", "description": "Ownership and beyond"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["guid"].as_str().unwrap().to_string()
}

async fn create_week(app: &Router, course: &str, number: Option<i64>, title: &str) -> (StatusCode, Value) {
    let mut payload = json!({"title": title});
    if let Some(number) = number {
        payload["week_number"] = json!(number);
    }
    send(
        app,
        "POST",
        &format!("/api/courses/{}/weeks", course),
        Some(TEACHER),
        Some(payload),
    )
    .await
}

async fn week_id(app: &Router, course: &str, number: i64, title: &str) -> String {
    let (status, body) = create_week(app, course, Some(number), title).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["guid"].as_str().unwrap().to_string()
}

async fn add_session(app: &Router, course: &str, week: &str, title: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        &format!("/api/courses/{}/weeks/{}/sessions", course, week),
        Some(TEACHER),
        Some(json!({"title": title, "video_url": "videos/intro.mp4", "duration_minutes": 20})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["guid"].as_str().unwrap().to_string()
}

async fn add_test(app: &Router, course: &str, week: &str, max_attempts: i64) -> String {
    let (status, body) = send(
        app,
        "POST",
        &format!("/api/courses/{}/weeks/{}/test", course, week),
        Some(TEACHER),
        Some(json!({"title": "Quiz", "pass_marks": 60, "max_attempts": max_attempts})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["guid"].as_str().unwrap().to_string()
}

async fn publish(app: &Router, course: &str, week: &str) -> (StatusCode, Value) {
    send(
        app,
        "PATCH",
        &format!("/api/courses/{}/weeks/{}", course, week),
        Some(TEACHER),
        Some(json!({"is_published": true})),
    )
    .await
}

async fn enroll(app: &Router, course: &str, student: &str, status: &str) -> String {
    let (code, body) = send(
        app,
        "POST",
        &format!("/api/courses/{}/batches", course),
        Some(ADMIN),
        Some(json!({"name": format!("Batch for {}", student), "status": "active"})),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED, "{}", body);
    let batch = body["data"]["guid"].as_str().unwrap().to_string();

    let (code, body) = send(
        app,
        "POST",
        &format!("/api/batches/{}/enrollments", batch),
        Some(ADMIN),
        Some(json!({"student_id": student, "status": status})),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED, "{}", body);
    body["data"]["enrollment"]["guid"].as_str().unwrap().to_string()
}

async fn week_titles(app: &Router, course: &str, caller: (&str, &str)) -> Vec<(i64, String)> {
    let (status, body) = send(
        app,
        "GET",
        &format!("/api/courses/{}/weeks", course),
        Some(caller),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| {
            (
                w["week_number"].as_i64().unwrap(),
                w["title"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

fn close_to(value: &Value, expected: f64) -> bool {
    value
        .as_f64()
        .map(|v| (v - expected).abs() < 1e-9)
        .unwrap_or(false)
}

// =============================================================================
// Health and identity
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_identity_required() {
    let app = setup_app(ReorderStrategy::Shift).await;

    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "elearn-api");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = setup_app(ReorderStrategy::Shift).await;

    let (status, body) = send(&app, "GET", "/api/courses", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_student_cannot_create_course() {
    let app = setup_app(ReorderStrategy::Shift).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/courses",
        Some(STUDENT),
        Some(json!({"title": "Nope"})),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_course_code_generated() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;

    let (status, body) = send(&app, "GET", &format!("/api/courses/{}", course), Some(STUDENT), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let code = body["data"]["code"].as_str().unwrap();
    assert!(code.starts_with("CRS") && code.len() == 9);
}

// =============================================================================
// Sequencing
// =============================================================================

#[tokio::test]
async fn test_week_gap_names_missing_week() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    week_id(&app, &course, 1, "Basics").await;
    week_id(&app, &course, 2, "Ownership").await;

    let (status, body) = create_week(&app, &course, Some(4), "Traits").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "SEQUENCE_GAP");
    assert_eq!(
        body["message"],
        "Week 3 must be created first before adding Week 4."
    );
    assert_eq!(body["error"]["details"], json!(["Week 3 is missing"]));
}

#[tokio::test]
async fn test_far_week_number_is_out_of_range() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    week_id(&app, &course, 1, "Basics").await;

    let (status, body) = create_week(&app, &course, Some(20_000_000), "Far").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "SEQUENCE_RANGE");
    assert_eq!(body["error"]["details"].as_array().unwrap().len(), 1);
    assert_eq!(week_titles(&app, &course, TEACHER).await.len(), 1);
}

#[tokio::test]
async fn test_week_without_number_is_appended() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    week_id(&app, &course, 1, "Basics").await;

    let (status, body) = create_week(&app, &course, None, "Ownership").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["week_number"], 2);
}

#[tokio::test]
async fn test_duplicate_week_number_conflicts() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    week_id(&app, &course, 1, "Basics").await;

    let (status, body) = create_week(&app, &course, Some(1), "Again").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "UNIQUENESS_CONFLICT");
}

#[tokio::test]
async fn test_move_last_week_to_front_shifts_others() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    week_id(&app, &course, 1, "W1").await;
    week_id(&app, &course, 2, "W2").await;
    let third = week_id(&app, &course, 3, "W3").await;

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/courses/{}/weeks/{}", course, third),
        Some(TEACHER),
        Some(json!({"week_number": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["week_number"], 1);
    assert_eq!(
        week_titles(&app, &course, TEACHER).await,
        vec![
            (1, "W3".to_string()),
            (2, "W1".to_string()),
            (3, "W2".to_string())
        ]
    );
}

#[tokio::test]
async fn test_swap_strategy_exchanges_positions() {
    let app = setup_app(ReorderStrategy::Swap).await;
    let course = create_course(&app).await;
    week_id(&app, &course, 1, "W1").await;
    week_id(&app, &course, 2, "W2").await;
    let third = week_id(&app, &course, 3, "W3").await;

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/courses/{}/weeks/{}", course, third),
        Some(TEACHER),
        Some(json!({"week_number": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        week_titles(&app, &course, TEACHER).await,
        vec![
            (1, "W3".to_string()),
            (2, "W2".to_string()),
            (3, "W1".to_string())
        ]
    );
}

#[tokio::test]
async fn test_move_out_of_range_and_noop() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    let first = week_id(&app, &course, 1, "W1").await;
    week_id(&app, &course, 2, "W2").await;

    let uri = format!("/api/courses/{}/weeks/{}", course, first);
    let (status, body) = send(&app, "PATCH", &uri, Some(TEACHER), Some(json!({"week_number": 3}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "SEQUENCE_RANGE");

    let (status, body) = send(&app, "PATCH", &uri, Some(TEACHER), Some(json!({"week_number": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "SEQUENCE_RANGE");

    let (status, body) = send(&app, "PATCH", &uri, Some(TEACHER), Some(json!({"week_number": 1, "title": "Intro"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Intro");
    assert_eq!(
        week_titles(&app, &course, TEACHER).await,
        vec![(1, "Intro".to_string()), (2, "W2".to_string())]
    );
}

#[tokio::test]
async fn test_session_gap_names_missing_session() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    let week = week_id(&app, &course, 1, "W1").await;
    add_session(&app, &course, &week, "S1").await;
    add_session(&app, &course, &week, "S2").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/courses/{}/weeks/{}/sessions", course, week),
        Some(TEACHER),
        Some(json!({"title": "S4", "session_number": 4})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "SEQUENCE_GAP");
    assert_eq!(
        body["message"],
        "Session 3 must be created first before adding Session 4."
    );
}

#[tokio::test]
async fn test_session_reorder_and_delete_compacts() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    let week = week_id(&app, &course, 1, "W1").await;
    let first = add_session(&app, &course, &week, "S1").await;
    add_session(&app, &course, &week, "S2").await;
    add_session(&app, &course, &week, "S3").await;

    let base = format!("/api/courses/{}/weeks/{}/sessions", course, week);
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("{}/{}", base, first),
        Some(TEACHER),
        Some(json!({"session_number": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &format!("{}/{}", base, first), Some(TEACHER), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", &base, Some(TEACHER), None).await;
    let order: Vec<(i64, String)> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            (
                s["session_number"].as_i64().unwrap(),
                s["title"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(order, vec![(1, "S2".to_string()), (2, "S3".to_string())]);
}

// =============================================================================
// Publish gate
// =============================================================================

#[tokio::test]
async fn test_publish_requires_sessions_then_test() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    let week = week_id(&app, &course, 1, "W1").await;

    let (status, body) = publish(&app, &course, &week).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "PUBLISH_PRECONDITION");
    assert_eq!(body["error"]["details"].as_array().unwrap().len(), 2);

    add_session(&app, &course, &week, "S1").await;
    let (status, body) = publish(&app, &course, &week).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"], json!(["Week 1 needs a test"]));

    add_test(&app, &course, &week, 1).await;
    let (status, body) = publish(&app, &course, &week).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["is_published"], true);

    // Unpublishing is always allowed
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/courses/{}/weeks/{}", course, week),
        Some(TEACHER),
        Some(json!({"is_published": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_published"], false);
}

#[tokio::test]
async fn test_create_published_week_is_refused_and_not_stored() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/courses/{}/weeks", course),
        Some(TEACHER),
        Some(json!({"title": "Eager", "is_published": true})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "PUBLISH_PRECONDITION");
    assert_eq!(
        body["error"]["details"],
        json!(["Week 1 needs at least one session", "Week 1 needs a test"])
    );
    assert!(week_titles(&app, &course, TEACHER).await.is_empty());
}

#[tokio::test]
async fn test_failed_publish_does_not_apply_other_changes() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    let week = week_id(&app, &course, 1, "W1").await;

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/courses/{}/weeks/{}", course, week),
        Some(TEACHER),
        Some(json!({"is_published": true, "title": "Renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(week_titles(&app, &course, TEACHER).await, vec![(1, "W1".to_string())]);
}

#[tokio::test]
async fn test_second_test_for_week_conflicts() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    let week = week_id(&app, &course, 1, "W1").await;
    add_test(&app, &course, &week, 1).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/courses/{}/weeks/{}/test", course, week),
        Some(TEACHER),
        Some(json!({"title": "Another"})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "UNIQUENESS_CONFLICT");
}

#[tokio::test]
async fn test_students_never_see_unpublished_weeks() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    let published = week_id(&app, &course, 1, "Visible").await;
    let hidden = week_id(&app, &course, 2, "Draft").await;
    add_session(&app, &course, &published, "S1").await;
    add_test(&app, &course, &published, 1).await;
    assert_eq!(publish(&app, &course, &published).await.0, StatusCode::OK);

    assert_eq!(
        week_titles(&app, &course, STUDENT).await,
        vec![(1, "Visible".to_string())]
    );
    assert_eq!(week_titles(&app, &course, TEACHER).await.len(), 2);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/courses/{}/weeks/{}", course, hidden),
        Some(STUDENT),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/courses/{}/weeks/{}", course, published),
        Some(STUDENT),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["can_publish"], true);
    assert_eq!(body["data"]["sessions"].as_array().unwrap().len(), 1);
}

// =============================================================================
// Delete guard
// =============================================================================

#[tokio::test]
async fn test_active_enrollment_blocks_week_delete() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    let first = week_id(&app, &course, 1, "W1").await;
    week_id(&app, &course, 2, "W2").await;
    let enrollment = enroll(&app, &course, STUDENT.0, "active").await;

    let uri = format!("/api/courses/{}/weeks/{}", course, first);
    let (status, body) = send(&app, "DELETE", &uri, Some(TEACHER), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DEPENDENCY_BLOCK");
    assert_eq!(body["error"]["details"][0], "1 active enrollment(s)");

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/enrollments/{}", enrollment),
        Some(TEACHER),
        Some(json!({"status": "completed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &uri, Some(TEACHER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(week_titles(&app, &course, TEACHER).await, vec![(1, "W2".to_string())]);
}

#[tokio::test]
async fn test_course_delete_blocked_by_batches() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    enroll(&app, &course, STUDENT.0, "pending").await;

    let (status, body) = send(&app, "DELETE", &format!("/api/courses/{}", course), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DEPENDENCY_BLOCK");

    let empty = create_course(&app).await;
    let (status, _) = send(&app, "DELETE", &format!("/api/courses/{}", empty), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("/api/courses/{}", empty), Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Progress
// =============================================================================

#[tokio::test]
async fn test_views_and_grades_flow_into_progress() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;

    let first = week_id(&app, &course, 1, "W1").await;
    let intro = add_session(&app, &course, &first, "S1").await;
    add_session(&app, &course, &first, "S2").await;
    let quiz = add_test(&app, &course, &first, 2).await;
    assert_eq!(publish(&app, &course, &first).await.0, StatusCode::OK);

    let second = week_id(&app, &course, 2, "W2").await;
    add_session(&app, &course, &second, "S1").await;
    add_test(&app, &course, &second, 1).await;
    assert_eq!(publish(&app, &course, &second).await.0, StatusCode::OK);

    let enrollment = enroll(&app, &course, STUDENT.0, "active").await;
    let progress_uri = format!("/api/enrollments/{}/progress", enrollment);

    let (status, body) = send(&app, "GET", &progress_uri, Some(STUDENT), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["videos_total"], 3);
    assert_eq!(body["data"]["tests_total"], 2);
    assert_eq!(body["data"]["current_week_unlocked"], 1);

    // A partial view does not count; a later fuller view does
    let views_uri = format!("/api/enrollments/{}/session-views", enrollment);
    let (status, body) = send(&app, "PUT", &views_uri, Some(STUDENT), Some(json!({"session_id": intro, "watched_percent": 40}))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["progress"]["videos_watched"], 0);

    let (_, body) = send(&app, "PUT", &views_uri, Some(STUDENT), Some(json!({"session_id": intro, "watched_percent": 95}))).await;
    assert_eq!(body["data"]["progress"]["videos_watched"], 1);
    assert!(close_to(&body["data"]["progress"]["progress_percent"], 16.67));

    // A lower percentage never lowers the stored view
    let (_, body) = send(&app, "PUT", &views_uri, Some(STUDENT), Some(json!({"session_id": intro, "watched_percent": 10}))).await;
    assert!(close_to(&body["data"]["view"]["watched_percent"], 95.0));

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/enrollments/{}/submissions", enrollment),
        Some(STUDENT),
        Some(json!({"test_id": quiz, "answer": "Borrowing rules"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["attempt_number"], 1);
    let submission = body["data"]["guid"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/submissions/{}/grade", submission),
        Some(TEACHER),
        Some(json!({"marks_obtained": 80, "remarks": "Solid"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_passed"], true);
    assert_eq!(body["data"]["status"], "graded");

    let (_, body) = send(&app, "GET", &progress_uri, Some(STUDENT), None).await;
    let progress = &body["data"];
    assert_eq!(progress["tests_attempted"], 1);
    assert_eq!(progress["tests_passed"], 1);
    assert_eq!(progress["current_week_unlocked"], 2);
    assert!(close_to(&progress["average_score"], 80.0));
    assert!(close_to(&progress["progress_percent"], 41.67));
    assert_eq!(progress["is_passed"], false);

    // Recompute with no new facts changes nothing
    let recompute_uri = format!("/api/enrollments/{}/progress/recompute", enrollment);
    let (status, first_run) = send(&app, "POST", &recompute_uri, Some(TEACHER), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second_run) = send(&app, "POST", &recompute_uri, Some(TEACHER), None).await;
    assert_eq!(first_run["data"], second_run["data"]);
    assert_eq!(first_run["data"]["progress_percent"], progress["progress_percent"]);
}

#[tokio::test]
async fn test_progress_read_reflects_unlock_date_without_other_writes() {
    let (app, pool) = setup_app_with_pool(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;

    let first = week_id(&app, &course, 1, "W1").await;
    add_session(&app, &course, &first, "S1").await;
    add_test(&app, &course, &first, 1).await;
    assert_eq!(publish(&app, &course, &first).await.0, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/courses/{}/weeks", course),
        Some(TEACHER),
        Some(json!({"title": "W2", "unlock_date": "2020-01-01"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let second = body["data"]["guid"].as_str().unwrap().to_string();
    add_session(&app, &course, &second, "S1").await;
    add_test(&app, &course, &second, 1).await;
    assert_eq!(publish(&app, &course, &second).await.0, StatusCode::OK);

    let enrollment = enroll(&app, &course, STUDENT.0, "active").await;

    // Simulate a row written before the unlock date passed
    sqlx::query("UPDATE progress SET current_week_unlocked = 1, computed_on = '2019-12-31'")
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/enrollments/{}/progress", enrollment),
        Some(STUDENT),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_week_unlocked"], 2);
    assert_ne!(body["data"]["computed_on"], "2019-12-31");
}

#[tokio::test]
async fn test_attempt_limit_and_inactive_enrollment() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    let week = week_id(&app, &course, 1, "W1").await;
    add_session(&app, &course, &week, "S1").await;
    let quiz = add_test(&app, &course, &week, 1).await;
    assert_eq!(publish(&app, &course, &week).await.0, StatusCode::OK);

    let active = enroll(&app, &course, STUDENT.0, "active").await;
    let uri = format!("/api/enrollments/{}/submissions", active);
    let payload = json!({"test_id": quiz, "answer": "first"});

    let (status, _) = send(&app, "POST", &uri, Some(STUDENT), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, "POST", &uri, Some(STUDENT), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid input: Maximum attempts (1) reached for this test");

    let pending = enroll(&app, &course, OTHER_STUDENT.0, "pending").await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/enrollments/{}/submissions", pending),
        Some(OTHER_STUDENT),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_student_cannot_read_another_students_progress() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;
    let enrollment = enroll(&app, &course, STUDENT.0, "active").await;
    let uri = format!("/api/enrollments/{}/progress", enrollment);

    let (status, _) = send(&app, "GET", &uri, Some(OTHER_STUDENT), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", &uri, Some(TEACHER), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_enrollment_conflicts() {
    let app = setup_app(ReorderStrategy::Shift).await;
    let course = create_course(&app).await;

    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/courses/{}/batches", course),
        Some(ADMIN),
        Some(json!({"name": "Evening", "max_students": 5})),
    )
    .await;
    let batch = body["data"]["guid"].as_str().unwrap().to_string();
    let uri = format!("/api/batches/{}/enrollments", batch);

    let (status, _) = send(&app, "POST", &uri, Some(ADMIN), Some(json!({"student_id": "s-9"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, "POST", &uri, Some(ADMIN), Some(json!({"student_id": "s-9"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "UNIQUENESS_CONFLICT");
}
