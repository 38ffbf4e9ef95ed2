//! Delete guard
//!
//! Destructive operations on course content are refused while any
//! enrollment in one of the course's batches is active.

use elearn_common::{Error, Result};
use sqlx::SqliteConnection;
use tracing::warn;
use uuid::Uuid;

use crate::db;

/// Blockers raised by active enrollments, empty when none exist
pub async fn active_enrollment_blockers(
    conn: &mut SqliteConnection,
    course_id: Uuid,
) -> Result<Vec<String>> {
    let by_batch = db::enrollments::active_by_batch(conn, course_id).await?;
    let total: i64 = by_batch.iter().map(|(_, count)| count).sum();
    if total == 0 {
        return Ok(Vec::new());
    }

    let mut blockers = vec![format!("{} active enrollment(s)", total)];
    blockers.extend(
        by_batch
            .into_iter()
            .map(|(name, count)| format!("batch '{}' has {} active student(s)", name, count)),
    );
    Ok(blockers)
}

/// Refuse deleting `entity` of the course while enrollments are active
pub async fn check_content_delete(
    conn: &mut SqliteConnection,
    course_id: Uuid,
    entity: &str,
) -> Result<()> {
    let blockers = active_enrollment_blockers(conn, course_id).await?;
    refuse_if_blocked(entity, blockers)
}

/// Refuse deleting the course while enrollments are active or batches remain
pub async fn check_course_delete(conn: &mut SqliteConnection, course_id: Uuid) -> Result<()> {
    let mut blockers = active_enrollment_blockers(conn, course_id).await?;

    let batches = db::batches::live_names(conn, course_id).await?;
    if !batches.is_empty() {
        blockers.push(format!(
            "{} batch(es) still exist: {}",
            batches.len(),
            batches.join(", ")
        ));
    }

    refuse_if_blocked("course", blockers)
}

fn refuse_if_blocked(entity: &str, blockers: Vec<String>) -> Result<()> {
    if blockers.is_empty() {
        return Ok(());
    }

    warn!("Refusing to delete {}: {}", entity, blockers.join("; "));
    Err(Error::DependencyBlock {
        entity: entity.to_string(),
        blockers,
    })
}
