//! Class session storage

use elearn_common::db::ClassSession;
use elearn_common::{time, uuid_utils, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

const COLUMNS: &str = "guid, week_id, session_number, title, description, video_url, duration_minutes, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<ClassSession> {
    Ok(ClassSession {
        guid: super::guid(row, "guid")?,
        week_id: super::guid(row, "week_id")?,
        session_number: row.try_get("session_number")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        video_url: row.try_get("video_url")?,
        duration_minutes: row.try_get("duration_minutes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub week_id: Uuid,
    pub session_number: i64,
    pub title: String,
    pub description: String,
    pub video_url: Option<String>,
    pub duration_minutes: i64,
}

pub async fn insert(conn: &mut SqliteConnection, new: NewSession) -> Result<ClassSession> {
    let guid = uuid_utils::generate();
    let now = time::now();

    sqlx::query(
        r#"
        INSERT INTO class_sessions (guid, week_id, session_number, title, description, video_url, duration_minutes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind(new.week_id.to_string())
    .bind(new.session_number)
    .bind(&new.title)
    .bind(&new.description)
    .bind(&new.video_url)
    .bind(new.duration_minutes)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(ClassSession {
        guid,
        week_id: new.week_id,
        session_number: new.session_number,
        title: new.title,
        description: new.description,
        video_url: new.video_url,
        duration_minutes: new.duration_minutes,
        created_at: now,
        updated_at: now,
    })
}

/// A session of the given week
pub async fn get(
    conn: &mut SqliteConnection,
    week_id: Uuid,
    session_id: Uuid,
) -> Result<Option<ClassSession>> {
    let sql = format!(
        "SELECT {} FROM class_sessions WHERE guid = ? AND week_id = ?",
        COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(session_id.to_string())
        .bind(week_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn list(conn: &mut SqliteConnection, week_id: Uuid) -> Result<Vec<ClassSession>> {
    let sql = format!(
        "SELECT {} FROM class_sessions WHERE week_id = ? ORDER BY session_number",
        COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(week_id.to_string())
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(from_row).collect()
}

pub async fn count(conn: &mut SqliteConnection, week_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM class_sessions WHERE week_id = ?")
        .bind(week_id.to_string())
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Session joined with the publish state and course of its week
#[derive(Debug, Clone)]
pub struct SessionPlacement {
    pub course_id: Uuid,
    pub week_published: bool,
}

pub async fn placement(
    conn: &mut SqliteConnection,
    session_id: Uuid,
) -> Result<Option<SessionPlacement>> {
    let row = sqlx::query(
        r#"
        SELECT w.course_id AS course_id, w.is_published AS is_published
        FROM class_sessions s
        JOIN weeks w ON w.guid = s.week_id
        WHERE s.guid = ?
        "#,
    )
    .bind(session_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref()
        .map(|row| -> Result<SessionPlacement> {
            Ok(SessionPlacement {
                course_id: super::guid(row, "course_id")?,
                week_published: row.try_get("is_published")?,
            })
        })
        .transpose()
}

/// Persist every non-position field of `session`
pub async fn update_fields(conn: &mut SqliteConnection, session: &ClassSession) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE class_sessions
        SET title = ?, description = ?, video_url = ?, duration_minutes = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&session.title)
    .bind(&session.description)
    .bind(&session.video_url)
    .bind(session.duration_minutes)
    .bind(session.updated_at)
    .bind(session.guid.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, session_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM class_sessions WHERE guid = ?")
        .bind(session_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}
