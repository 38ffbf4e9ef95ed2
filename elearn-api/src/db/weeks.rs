//! Week storage
//!
//! Positions are written only through [`super::sequence`]; this module
//! handles the remaining columns.

use chrono::NaiveDate;
use elearn_common::db::Week;
use elearn_common::{time, uuid_utils, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

const COLUMNS: &str =
    "guid, course_id, week_number, title, description, unlock_date, is_published, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<Week> {
    Ok(Week {
        guid: super::guid(row, "guid")?,
        course_id: super::guid(row, "course_id")?,
        week_number: row.try_get("week_number")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        unlock_date: row.try_get("unlock_date")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[derive(Debug, Clone)]
pub struct NewWeek {
    pub course_id: Uuid,
    pub week_number: i64,
    pub title: String,
    pub description: String,
    pub unlock_date: Option<NaiveDate>,
}

/// Insert an unpublished week at an already validated position
pub async fn insert(conn: &mut SqliteConnection, new: NewWeek) -> Result<Week> {
    let guid = uuid_utils::generate();
    let now = time::now();

    sqlx::query(
        r#"
        INSERT INTO weeks (guid, course_id, week_number, title, description, unlock_date, is_published, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind(new.course_id.to_string())
    .bind(new.week_number)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.unlock_date)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(Week {
        guid,
        course_id: new.course_id,
        week_number: new.week_number,
        title: new.title,
        description: new.description,
        unlock_date: new.unlock_date,
        is_published: false,
        created_at: now,
        updated_at: now,
    })
}

/// A week of the given course
pub async fn get(
    conn: &mut SqliteConnection,
    course_id: Uuid,
    week_id: Uuid,
) -> Result<Option<Week>> {
    let sql = format!("SELECT {} FROM weeks WHERE guid = ? AND course_id = ?", COLUMNS);
    let row = sqlx::query(&sql)
        .bind(week_id.to_string())
        .bind(course_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// Weeks of a course in order
pub async fn list(
    conn: &mut SqliteConnection,
    course_id: Uuid,
    published_only: bool,
) -> Result<Vec<Week>> {
    let filter = if published_only { " AND is_published = 1" } else { "" };
    let sql = format!(
        "SELECT {} FROM weeks WHERE course_id = ?{} ORDER BY week_number",
        COLUMNS, filter
    );
    let rows = sqlx::query(&sql)
        .bind(course_id.to_string())
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(from_row).collect()
}

/// Persist every non-position field of `week`
pub async fn update_fields(conn: &mut SqliteConnection, week: &Week) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE weeks
        SET title = ?, description = ?, unlock_date = ?, is_published = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&week.title)
    .bind(&week.description)
    .bind(week.unlock_date)
    .bind(week.is_published)
    .bind(week.updated_at)
    .bind(week.guid.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, week_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM weeks WHERE guid = ?")
        .bind(week_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}
