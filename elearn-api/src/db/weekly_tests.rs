//! Weekly test storage (at most one per week)

use elearn_common::db::WeeklyTest;
use elearn_common::{time, uuid_utils, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

const COLUMNS: &str = "guid, week_id, title, instructions, questions, pass_marks, max_attempts, unlocks_next_week, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<WeeklyTest> {
    Ok(WeeklyTest {
        guid: super::guid(row, "guid")?,
        week_id: super::guid(row, "week_id")?,
        title: row.try_get("title")?,
        instructions: row.try_get("instructions")?,
        questions: row.try_get("questions")?,
        pass_marks: row.try_get("pass_marks")?,
        max_attempts: row.try_get("max_attempts")?,
        unlocks_next_week: row.try_get("unlocks_next_week")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[derive(Debug, Clone)]
pub struct NewTest {
    pub week_id: Uuid,
    pub title: String,
    pub instructions: String,
    pub questions: String,
    pub pass_marks: f64,
    pub max_attempts: i64,
    pub unlocks_next_week: bool,
}

pub async fn insert(conn: &mut SqliteConnection, new: NewTest) -> Result<WeeklyTest> {
    let guid = uuid_utils::generate();
    let now = time::now();

    sqlx::query(
        r#"
        INSERT INTO weekly_tests (guid, week_id, title, instructions, questions, pass_marks, max_attempts, unlocks_next_week, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind(new.week_id.to_string())
    .bind(&new.title)
    .bind(&new.instructions)
    .bind(&new.questions)
    .bind(new.pass_marks)
    .bind(new.max_attempts)
    .bind(new.unlocks_next_week)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(WeeklyTest {
        guid,
        week_id: new.week_id,
        title: new.title,
        instructions: new.instructions,
        questions: new.questions,
        pass_marks: new.pass_marks,
        max_attempts: new.max_attempts,
        unlocks_next_week: new.unlocks_next_week,
        created_at: now,
        updated_at: now,
    })
}

pub async fn for_week(conn: &mut SqliteConnection, week_id: Uuid) -> Result<Option<WeeklyTest>> {
    let sql = format!("SELECT {} FROM weekly_tests WHERE week_id = ?", COLUMNS);
    let row = sqlx::query(&sql)
        .bind(week_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn get(conn: &mut SqliteConnection, test_id: Uuid) -> Result<Option<WeeklyTest>> {
    let sql = format!("SELECT {} FROM weekly_tests WHERE guid = ?", COLUMNS);
    let row = sqlx::query(&sql)
        .bind(test_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// Course and publish state of the week holding a test
pub async fn placement(
    conn: &mut SqliteConnection,
    test_id: Uuid,
) -> Result<Option<(Uuid, bool)>> {
    let row = sqlx::query(
        r#"
        SELECT w.course_id AS course_id, w.is_published AS is_published
        FROM weekly_tests t
        JOIN weeks w ON w.guid = t.week_id
        WHERE t.guid = ?
        "#,
    )
    .bind(test_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref()
        .map(|row| -> Result<(Uuid, bool)> {
            Ok((super::guid(row, "course_id")?, row.try_get("is_published")?))
        })
        .transpose()
}

pub async fn update_fields(conn: &mut SqliteConnection, test: &WeeklyTest) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE weekly_tests
        SET title = ?, instructions = ?, questions = ?, pass_marks = ?, max_attempts = ?,
            unlocks_next_week = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&test.title)
    .bind(&test.instructions)
    .bind(&test.questions)
    .bind(test.pass_marks)
    .bind(test.max_attempts)
    .bind(test.unlocks_next_week)
    .bind(test.updated_at)
    .bind(test.guid.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, test_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM weekly_tests WHERE guid = ?")
        .bind(test_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}
