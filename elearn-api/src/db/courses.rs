//! Course storage

use elearn_common::db::Course;
use elearn_common::{time, uuid_utils, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

const COLUMNS: &str =
    "guid, code, title, description, difficulty, is_active, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<Course> {
    Ok(Course {
        guid: super::guid(row, "guid")?,
        code: row.try_get("code")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        difficulty: row.try_get("difficulty")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn code_taken(conn: &mut SqliteConnection, code: &str) -> Result<bool> {
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE code = ?)")
        .bind(code)
        .fetch_one(&mut *conn)
        .await?;
    Ok(taken)
}

pub async fn insert(
    conn: &mut SqliteConnection,
    title: &str,
    description: &str,
    difficulty: &str,
) -> Result<Course> {
    let mut code = uuid_utils::short_code("CRS");
    while code_taken(conn, &code).await? {
        code = uuid_utils::short_code("CRS");
    }

    let guid = uuid_utils::generate();
    let now = time::now();

    sqlx::query(
        r#"
        INSERT INTO courses (guid, code, title, description, difficulty, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind(&code)
    .bind(title)
    .bind(description)
    .bind(difficulty)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(Course {
        guid,
        code,
        title: title.to_string(),
        description: description.to_string(),
        difficulty: difficulty.to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    })
}

/// Non-deleted courses, newest first
pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Course>> {
    let sql = format!(
        "SELECT {} FROM courses WHERE is_deleted = 0 ORDER BY created_at DESC, title",
        COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    rows.iter().map(from_row).collect()
}

/// A non-deleted course
pub async fn get(conn: &mut SqliteConnection, course_id: Uuid) -> Result<Option<Course>> {
    let sql = format!(
        "SELECT {} FROM courses WHERE guid = ? AND is_deleted = 0",
        COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(course_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn soft_delete(conn: &mut SqliteConnection, course_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE courses SET is_deleted = 1, is_active = 0, updated_at = ? WHERE guid = ?")
        .bind(time::now())
        .bind(course_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}
