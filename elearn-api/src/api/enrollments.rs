//! Enrollment, fact and progress endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use elearn_common::db::{Enrollment, EnrollmentStatus, ProgressRecord, SessionView, TestSubmission};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::ApiResult;
use crate::response::{self, Envelope};
use crate::services::learning::{self, EnrollInput, GradeInput, SubmissionInput, ViewInput};
use crate::services::progress;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: EnrollmentStatus,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentWithProgress {
    pub enrollment: Enrollment,
    pub progress: ProgressRecord,
}

#[derive(Debug, Serialize)]
pub struct ViewWithProgress {
    pub view: SessionView,
    pub progress: ProgressRecord,
}

/// POST /api/batches/:batch_id/enrollments
pub async fn enroll(
    State(state): State<AppState>,
    caller: Caller,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<EnrollInput>,
) -> ApiResult<(StatusCode, Json<Envelope<EnrollmentWithProgress>>)> {
    caller.require_staff()?;

    let rules = state.rules();
    let mut tx = state.db.begin().await?;
    let (enrollment, progress) = learning::enroll(&mut tx, &rules, batch_id, input).await?;
    tx.commit().await?;

    Ok(response::created(
        "Student enrolled successfully",
        EnrollmentWithProgress {
            enrollment,
            progress,
        },
    ))
}

/// PATCH /api/enrollments/:enrollment_id
pub async fn update_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(enrollment_id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Json<Envelope<Enrollment>>> {
    caller.require_staff()?;

    let mut tx = state.db.begin().await?;
    let enrollment = learning::set_status(&mut tx, enrollment_id, request.status).await?;
    tx.commit().await?;

    Ok(response::ok("Enrollment updated successfully", enrollment))
}

/// PUT /api/enrollments/:enrollment_id/session-views
pub async fn record_view(
    State(state): State<AppState>,
    caller: Caller,
    Path(enrollment_id): Path<Uuid>,
    Json(input): Json<ViewInput>,
) -> ApiResult<Json<Envelope<ViewWithProgress>>> {
    let rules = state.rules();
    let mut tx = state.db.begin().await?;
    let enrollment = learning::load_enrollment(&mut tx, enrollment_id).await?;
    caller.require_self_or_staff(&enrollment.student_id)?;

    let (view, progress) = learning::record_view(&mut tx, &rules, &enrollment, input).await?;
    tx.commit().await?;

    Ok(response::ok(
        "View recorded successfully",
        ViewWithProgress { view, progress },
    ))
}

/// POST /api/enrollments/:enrollment_id/submissions
pub async fn submit_test(
    State(state): State<AppState>,
    caller: Caller,
    Path(enrollment_id): Path<Uuid>,
    Json(input): Json<SubmissionInput>,
) -> ApiResult<(StatusCode, Json<Envelope<TestSubmission>>)> {
    let rules = state.rules();
    let mut tx = state.db.begin().await?;
    let enrollment = learning::load_enrollment(&mut tx, enrollment_id).await?;
    caller.require_self_or_staff(&enrollment.student_id)?;

    let submission = learning::submit(&mut tx, &rules, &enrollment, input).await?;
    tx.commit().await?;

    Ok(response::created("Test submitted successfully", submission))
}

/// POST /api/submissions/:submission_id/grade
pub async fn grade_submission(
    State(state): State<AppState>,
    caller: Caller,
    Path(submission_id): Path<Uuid>,
    Json(input): Json<GradeInput>,
) -> ApiResult<Json<Envelope<TestSubmission>>> {
    caller.require_staff()?;

    let rules = state.rules();
    let mut tx = state.db.begin().await?;
    let submission = learning::grade(&mut tx, &rules, submission_id, input).await?;
    tx.commit().await?;

    Ok(response::ok("Submission graded successfully", submission))
}

/// GET /api/enrollments/:enrollment_id/progress
///
/// Recomputed as of today before it is returned, so weeks opened by their
/// unlock date show up without any other write.
pub async fn get_progress(
    State(state): State<AppState>,
    caller: Caller,
    Path(enrollment_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<ProgressRecord>>> {
    let rules = state.rules();
    let mut tx = state.db.begin().await?;
    let enrollment = learning::load_enrollment(&mut tx, enrollment_id).await?;
    caller.require_self_or_staff(&enrollment.student_id)?;

    let record = progress::recompute(&mut tx, enrollment_id, &rules.policy, rules.as_of).await?;
    tx.commit().await?;

    Ok(response::ok("Progress retrieved successfully", record))
}

/// POST /api/enrollments/:enrollment_id/progress/recompute
pub async fn recompute_progress(
    State(state): State<AppState>,
    caller: Caller,
    Path(enrollment_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<ProgressRecord>>> {
    caller.require_staff()?;

    let rules = state.rules();
    let mut tx = state.db.begin().await?;
    let record = progress::recompute(&mut tx, enrollment_id, &rules.policy, rules.as_of).await?;
    tx.commit().await?;

    Ok(response::ok("Progress recomputed successfully", record))
}
