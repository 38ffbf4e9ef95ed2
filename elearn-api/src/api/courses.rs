//! Course and batch endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use elearn_common::db::{Batch, BatchStatus, Course, Week};
use elearn_common::Error;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::Caller;
use crate::db;
use crate::error::ApiResult;
use crate::response::{self, Envelope};
use crate::services::{delete_guard, require_title};
use crate::AppState;

const DEFAULT_MAX_STUDENTS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    pub name: String,
    #[serde(default)]
    pub status: BatchStatus,
    pub max_students: Option<i64>,
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub weeks: Vec<Week>,
    pub batches: Vec<Batch>,
}

async fn load_course(conn: &mut sqlx::SqliteConnection, course_id: Uuid) -> ApiResult<Course> {
    Ok(db::courses::get(conn, course_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("course {}", course_id)))?)
}

/// GET /api/courses
pub async fn list_courses(
    State(state): State<AppState>,
    _caller: Caller,
) -> ApiResult<Json<Envelope<Vec<Course>>>> {
    let mut conn = state.db.acquire().await?;
    let courses = db::courses::list(&mut conn).await?;
    Ok(response::ok("Courses retrieved successfully", courses))
}

/// POST /api/courses
pub async fn create_course(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<CreateCourseRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<Course>>)> {
    caller.require_admin()?;
    require_title(&request.title)?;

    let mut conn = state.db.acquire().await?;
    let course = db::courses::insert(
        &mut conn,
        request.title.trim(),
        &request.description,
        request.difficulty.as_deref().unwrap_or("beginner"),
    )
    .await?;

    info!("Created course {} ({})", course.code, course.guid);
    Ok(response::created("Course created successfully", course))
}

/// GET /api/courses/:course_id
pub async fn get_course(
    State(state): State<AppState>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<CourseDetail>>> {
    let mut conn = state.db.acquire().await?;
    let course = load_course(&mut conn, course_id).await?;
    let weeks = db::weeks::list(&mut conn, course_id, caller.is_student()).await?;
    let batches = db::batches::list_for_course(&mut conn, course_id).await?;

    Ok(response::ok(
        "Course retrieved successfully",
        CourseDetail {
            course,
            weeks,
            batches,
        },
    ))
}

/// DELETE /api/courses/:course_id
///
/// Soft delete, refused while active enrollments or live batches exist.
pub async fn delete_course(
    State(state): State<AppState>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<()>>> {
    caller.require_admin()?;

    let mut tx = state.db.begin().await?;
    let course = load_course(&mut tx, course_id).await?;
    delete_guard::check_course_delete(&mut tx, course_id).await?;
    db::courses::soft_delete(&mut tx, course_id).await?;
    tx.commit().await?;

    info!("Deleted course {} ({})", course.code, course_id);
    Ok(response::done("Course deleted successfully"))
}

/// GET /api/courses/:course_id/batches
pub async fn list_batches(
    State(state): State<AppState>,
    _caller: Caller,
    Path(course_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<Vec<Batch>>>> {
    let mut conn = state.db.acquire().await?;
    load_course(&mut conn, course_id).await?;
    let batches = db::batches::list_for_course(&mut conn, course_id).await?;
    Ok(response::ok("Batches retrieved successfully", batches))
}

/// POST /api/courses/:course_id/batches
pub async fn create_batch(
    State(state): State<AppState>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
    Json(request): Json<CreateBatchRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<Batch>>)> {
    caller.require_admin()?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("name must not be empty".to_string()).into());
    }
    let max_students = request.max_students.unwrap_or(DEFAULT_MAX_STUDENTS);
    if max_students < 1 {
        return Err(Error::InvalidInput("max_students must be at least 1".to_string()).into());
    }

    let mut tx = state.db.begin().await?;
    load_course(&mut tx, course_id).await?;
    let batch = db::batches::insert(
        &mut tx,
        db::batches::NewBatch {
            course_id,
            name: name.to_string(),
            status: request.status,
            max_students,
            start_date: request.start_date,
        },
    )
    .await?;
    tx.commit().await?;

    info!("Created batch {} for course {}", batch.code, course_id);
    Ok(response::created("Batch created successfully", batch))
}
