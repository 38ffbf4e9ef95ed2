//! Enrollment storage

use elearn_common::db::{Enrollment, EnrollmentStatus};
use elearn_common::{time, uuid_utils, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

fn from_row(row: &SqliteRow) -> Result<Enrollment> {
    Ok(Enrollment {
        guid: super::guid(row, "guid")?,
        batch_id: super::guid(row, "batch_id")?,
        student_id: row.try_get("student_id")?,
        status: super::status(row, "status")?,
        enrolled_at: row.try_get("enrolled_at")?,
    })
}

pub async fn insert(
    conn: &mut SqliteConnection,
    batch_id: Uuid,
    student_id: &str,
    status: EnrollmentStatus,
) -> Result<Enrollment> {
    let guid = uuid_utils::generate();
    let now = time::now();

    sqlx::query(
        "INSERT INTO enrollments (guid, batch_id, student_id, status, enrolled_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(guid.to_string())
    .bind(batch_id.to_string())
    .bind(student_id)
    .bind(status.as_str())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(Enrollment {
        guid,
        batch_id,
        student_id: student_id.to_string(),
        status,
        enrolled_at: now,
    })
}

pub async fn get(conn: &mut SqliteConnection, enrollment_id: Uuid) -> Result<Option<Enrollment>> {
    let row = sqlx::query(
        "SELECT guid, batch_id, student_id, status, enrolled_at FROM enrollments WHERE guid = ?",
    )
    .bind(enrollment_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    enrollment_id: Uuid,
    status: EnrollmentStatus,
) -> Result<()> {
    sqlx::query("UPDATE enrollments SET status = ? WHERE guid = ?")
        .bind(status.as_str())
        .bind(enrollment_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Enrollments occupying a seat (everything except dropped)
pub async fn seats_taken(conn: &mut SqliteConnection, batch_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM enrollments WHERE batch_id = ? AND status != 'dropped'",
    )
    .bind(batch_id.to_string())
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

/// Course an enrollment belongs to, through its batch
pub async fn course_of(conn: &mut SqliteConnection, enrollment_id: Uuid) -> Result<Option<Uuid>> {
    let raw: Option<String> = sqlx::query_scalar(
        r#"
        SELECT b.course_id FROM enrollments e
        JOIN batches b ON b.guid = e.batch_id
        WHERE e.guid = ?
        "#,
    )
    .bind(enrollment_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;
    raw.as_deref().map(uuid_utils::parse).transpose()
}

/// Every enrollment in any batch of the course
pub async fn ids_for_course(conn: &mut SqliteConnection, course_id: Uuid) -> Result<Vec<Uuid>> {
    let raw: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT e.guid FROM enrollments e
        JOIN batches b ON b.guid = e.batch_id
        WHERE b.course_id = ?
        ORDER BY e.enrolled_at
        "#,
    )
    .bind(course_id.to_string())
    .fetch_all(&mut *conn)
    .await?;
    raw.iter().map(|id| uuid_utils::parse(id)).collect()
}

/// Active enrollment counts per batch of the course, busiest first
pub async fn active_by_batch(
    conn: &mut SqliteConnection,
    course_id: Uuid,
) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query(
        r#"
        SELECT b.name AS name, COUNT(*) AS active
        FROM enrollments e
        JOIN batches b ON b.guid = e.batch_id
        WHERE b.course_id = ? AND e.status = 'active'
        GROUP BY b.guid, b.name
        ORDER BY active DESC, b.name
        "#,
    )
    .bind(course_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| -> Result<(String, i64)> { Ok((row.try_get("name")?, row.try_get("active")?)) })
        .collect()
}
