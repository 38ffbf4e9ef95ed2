//! Week endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use elearn_common::db::{ClassSession, Week, WeeklyTest};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Caller;
use crate::db;
use crate::error::ApiResult;
use crate::response::{self, Envelope};
use crate::services::curriculum::{self, WeekInput, WeekPatch};
use crate::services::publish_gate;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct WeekDetail {
    #[serde(flatten)]
    pub week: Week,
    pub sessions: Vec<ClassSession>,
    pub test: Option<WeeklyTest>,
    pub can_publish: bool,
}

/// GET /api/courses/:course_id/weeks
///
/// Students only see published weeks.
pub async fn list_weeks(
    State(state): State<AppState>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<Vec<Week>>>> {
    let mut conn = state.db.acquire().await?;
    db::courses::get(&mut conn, course_id)
        .await?
        .ok_or_else(|| elearn_common::Error::NotFound(format!("course {}", course_id)))?;

    let weeks = db::weeks::list(&mut conn, course_id, caller.is_student()).await?;
    Ok(response::ok("Weeks retrieved successfully", weeks))
}

/// POST /api/courses/:course_id/weeks
pub async fn create_week(
    State(state): State<AppState>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
    Json(input): Json<WeekInput>,
) -> ApiResult<(StatusCode, Json<Envelope<Week>>)> {
    caller.require_staff()?;

    let mut tx = state.db.begin().await?;
    let week = curriculum::create_week(&mut tx, course_id, input).await?;
    tx.commit().await?;

    Ok(response::created("Week created successfully", week))
}

/// GET /api/courses/:course_id/weeks/:week_id
pub async fn get_week(
    State(state): State<AppState>,
    caller: Caller,
    Path((course_id, week_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Envelope<WeekDetail>>> {
    let mut conn = state.db.acquire().await?;
    let week = super::visible_week(&mut conn, &caller, course_id, week_id).await?;

    let sessions = db::sessions::list(&mut conn, week.guid).await?;
    let test = db::weekly_tests::for_week(&mut conn, week.guid).await?;
    let can_publish = publish_gate::can_publish(&mut conn, week.guid, week.week_number).await?;

    Ok(response::ok(
        "Week retrieved successfully",
        WeekDetail {
            week,
            sessions,
            test,
            can_publish,
        },
    ))
}

/// PATCH /api/courses/:course_id/weeks/:week_id
///
/// Renumbering, field edits and publish toggles in one transaction.
pub async fn update_week(
    State(state): State<AppState>,
    caller: Caller,
    Path((course_id, week_id)): Path<(Uuid, Uuid)>,
    Json(patch): Json<WeekPatch>,
) -> ApiResult<Json<Envelope<Week>>> {
    caller.require_staff()?;

    let rules = state.rules();
    let mut tx = state.db.begin().await?;
    let week = curriculum::update_week(&mut tx, &rules, course_id, week_id, patch).await?;
    tx.commit().await?;

    Ok(response::ok("Week updated successfully", week))
}

/// DELETE /api/courses/:course_id/weeks/:week_id
pub async fn delete_week(
    State(state): State<AppState>,
    caller: Caller,
    Path((course_id, week_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Envelope<()>>> {
    caller.require_staff()?;

    let rules = state.rules();
    let mut tx = state.db.begin().await?;
    curriculum::delete_week(&mut tx, &rules, course_id, week_id).await?;
    tx.commit().await?;

    Ok(response::done("Week deleted successfully"))
}
