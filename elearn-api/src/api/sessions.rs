//! Class session endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use elearn_common::db::ClassSession;
use uuid::Uuid;

use crate::auth::Caller;
use crate::db;
use crate::error::ApiResult;
use crate::response::{self, Envelope};
use crate::services::curriculum::{self, SessionInput, SessionPatch};
use crate::AppState;

/// GET /api/courses/:course_id/weeks/:week_id/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    caller: Caller,
    Path((course_id, week_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Envelope<Vec<ClassSession>>>> {
    let mut conn = state.db.acquire().await?;
    let week = super::visible_week(&mut conn, &caller, course_id, week_id).await?;
    let sessions = db::sessions::list(&mut conn, week.guid).await?;
    Ok(response::ok("Sessions retrieved successfully", sessions))
}

/// POST /api/courses/:course_id/weeks/:week_id/sessions
pub async fn create_session(
    State(state): State<AppState>,
    caller: Caller,
    Path((course_id, week_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<SessionInput>,
) -> ApiResult<(StatusCode, Json<Envelope<ClassSession>>)> {
    caller.require_staff()?;

    let rules = state.rules();
    let mut tx = state.db.begin().await?;
    let session = curriculum::create_session(&mut tx, &rules, course_id, week_id, input).await?;
    tx.commit().await?;

    Ok(response::created("Session created successfully", session))
}

/// GET /api/courses/:course_id/weeks/:week_id/sessions/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    caller: Caller,
    Path((course_id, week_id, session_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Json<Envelope<ClassSession>>> {
    let mut conn = state.db.acquire().await?;
    super::visible_week(&mut conn, &caller, course_id, week_id).await?;
    let session = curriculum::load_session(&mut conn, week_id, session_id).await?;
    Ok(response::ok("Session retrieved successfully", session))
}

/// PATCH /api/courses/:course_id/weeks/:week_id/sessions/:session_id
pub async fn update_session(
    State(state): State<AppState>,
    caller: Caller,
    Path((course_id, week_id, session_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(patch): Json<SessionPatch>,
) -> ApiResult<Json<Envelope<ClassSession>>> {
    caller.require_staff()?;

    let rules = state.rules();
    let mut tx = state.db.begin().await?;
    let session =
        curriculum::update_session(&mut tx, &rules, course_id, week_id, session_id, patch).await?;
    tx.commit().await?;

    Ok(response::ok("Session updated successfully", session))
}

/// DELETE /api/courses/:course_id/weeks/:week_id/sessions/:session_id
pub async fn delete_session(
    State(state): State<AppState>,
    caller: Caller,
    Path((course_id, week_id, session_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Json<Envelope<()>>> {
    caller.require_staff()?;

    let rules = state.rules();
    let mut tx = state.db.begin().await?;
    curriculum::delete_session(&mut tx, &rules, course_id, week_id, session_id).await?;
    tx.commit().await?;

    Ok(response::done("Session deleted successfully"))
}
