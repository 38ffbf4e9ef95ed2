//! HTTP API handlers for elearn-api

pub mod courses;
pub mod enrollments;
pub mod health;
pub mod sessions;
pub mod weeks;

pub use health::health_routes;

use elearn_common::db::Week;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::services::curriculum;

/// Load a week the caller may see; students never see unpublished weeks
pub(crate) async fn visible_week(
    conn: &mut SqliteConnection,
    caller: &Caller,
    course_id: Uuid,
    week_id: Uuid,
) -> ApiResult<Week> {
    let week = curriculum::load_week(conn, course_id, week_id).await?;
    if caller.is_student() && !week.is_published {
        return Err(ApiError::Forbidden(format!(
            "week {} is not published",
            week.week_number
        )));
    }
    Ok(week)
}
