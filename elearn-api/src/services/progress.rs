//! Progress recompute
//!
//! The only writer of progress rows. Runs on the caller's transaction so a
//! fact and the progress derived from it commit together.

use chrono::NaiveDate;
use elearn_common::db::ProgressRecord;
use elearn_common::progress::aggregate;
use elearn_common::{Error, ProgressPolicy, Result};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db;

/// Recompute and store one enrollment's progress as of `as_of`
pub async fn recompute(
    conn: &mut SqliteConnection,
    enrollment_id: Uuid,
    policy: &ProgressPolicy,
    as_of: NaiveDate,
) -> Result<ProgressRecord> {
    let course_id = db::enrollments::course_of(conn, enrollment_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("enrollment {}", enrollment_id)))?;

    let outline = db::progress::load_outline(conn, course_id).await?;
    let facts = db::facts::for_enrollment(conn, enrollment_id).await?;
    let snapshot = aggregate(&outline, &facts, policy, as_of);

    db::progress::upsert(conn, enrollment_id, &snapshot, as_of).await?;
    debug!(
        "Progress for enrollment {}: {}% (week {} unlocked)",
        enrollment_id, snapshot.progress_percent, snapshot.current_week_unlocked
    );

    Ok(ProgressRecord {
        enrollment_id,
        snapshot,
        computed_on: as_of,
    })
}

/// Recompute every enrollment of a course after a structural change
pub async fn recompute_course(
    conn: &mut SqliteConnection,
    course_id: Uuid,
    policy: &ProgressPolicy,
    as_of: NaiveDate,
) -> Result<usize> {
    let enrollments = db::enrollments::ids_for_course(conn, course_id).await?;
    for enrollment_id in &enrollments {
        recompute(conn, *enrollment_id, policy, as_of).await?;
    }

    if !enrollments.is_empty() {
        info!(
            "Recomputed progress for {} enrollment(s) of course {}",
            enrollments.len(),
            course_id
        );
    }
    Ok(enrollments.len())
}
