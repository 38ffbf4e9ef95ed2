//! Batch storage

use chrono::NaiveDate;
use elearn_common::db::{Batch, BatchStatus};
use elearn_common::{time, uuid_utils, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

const COLUMNS: &str = "guid, course_id, code, name, status, max_students, start_date, created_at";

fn from_row(row: &SqliteRow) -> Result<Batch> {
    Ok(Batch {
        guid: super::guid(row, "guid")?,
        course_id: super::guid(row, "course_id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        status: super::status(row, "status")?,
        max_students: row.try_get("max_students")?,
        start_date: row.try_get("start_date")?,
        created_at: row.try_get("created_at")?,
    })
}

#[derive(Debug, Clone)]
pub struct NewBatch {
    pub course_id: Uuid,
    pub name: String,
    pub status: BatchStatus,
    pub max_students: i64,
    pub start_date: Option<NaiveDate>,
}

pub async fn insert(conn: &mut SqliteConnection, new: NewBatch) -> Result<Batch> {
    let mut code = uuid_utils::short_code("BAT");
    loop {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM batches WHERE code = ?)")
                .bind(&code)
                .fetch_one(&mut *conn)
                .await?;
        if !taken {
            break;
        }
        code = uuid_utils::short_code("BAT");
    }

    let guid = uuid_utils::generate();
    let now = time::now();

    sqlx::query(
        r#"
        INSERT INTO batches (guid, course_id, code, name, status, max_students, start_date, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind(new.course_id.to_string())
    .bind(&code)
    .bind(&new.name)
    .bind(new.status.as_str())
    .bind(new.max_students)
    .bind(new.start_date)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(Batch {
        guid,
        course_id: new.course_id,
        code,
        name: new.name,
        status: new.status,
        max_students: new.max_students,
        start_date: new.start_date,
        created_at: now,
    })
}

pub async fn list_for_course(conn: &mut SqliteConnection, course_id: Uuid) -> Result<Vec<Batch>> {
    let sql = format!(
        "SELECT {} FROM batches WHERE course_id = ? AND is_deleted = 0 ORDER BY created_at, name",
        COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(course_id.to_string())
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(from_row).collect()
}

pub async fn get(conn: &mut SqliteConnection, batch_id: Uuid) -> Result<Option<Batch>> {
    let sql = format!(
        "SELECT {} FROM batches WHERE guid = ? AND is_deleted = 0",
        COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(batch_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// Names of the course's non-deleted batches
pub async fn live_names(conn: &mut SqliteConnection, course_id: Uuid) -> Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM batches WHERE course_id = ? AND is_deleted = 0 ORDER BY name",
    )
    .bind(course_id.to_string())
    .fetch_all(&mut *conn)
    .await?;
    Ok(names)
}
