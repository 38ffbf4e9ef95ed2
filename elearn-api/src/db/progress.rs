//! Progress rows and the course outline they are computed from

use chrono::NaiveDate;
use elearn_common::db::ProgressRecord;
use elearn_common::progress::{CourseOutline, TestOutline, WeekOutline};
use elearn_common::{ProgressSnapshot, Result};
use sqlx::{Row, SqliteConnection};
use std::collections::HashMap;
use uuid::Uuid;

/// Ordered week, session and test structure of a course
pub async fn load_outline(conn: &mut SqliteConnection, course_id: Uuid) -> Result<CourseOutline> {
    let week_rows = sqlx::query(
        r#"
        SELECT w.guid AS guid, w.week_number AS week_number, w.is_published AS is_published,
               w.unlock_date AS unlock_date,
               t.guid AS test_id, t.pass_marks AS pass_marks, t.unlocks_next_week AS unlocks_next_week
        FROM weeks w
        LEFT JOIN weekly_tests t ON t.week_id = w.guid
        WHERE w.course_id = ?
        ORDER BY w.week_number
        "#,
    )
    .bind(course_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    let session_rows = sqlx::query(
        r#"
        SELECT s.guid AS guid, s.week_id AS week_id
        FROM class_sessions s
        JOIN weeks w ON w.guid = s.week_id
        WHERE w.course_id = ?
        ORDER BY s.session_number
        "#,
    )
    .bind(course_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    let mut sessions_by_week: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for row in &session_rows {
        sessions_by_week
            .entry(super::guid(row, "week_id")?)
            .or_default()
            .push(super::guid(row, "guid")?);
    }

    let mut weeks = Vec::with_capacity(week_rows.len());
    for row in &week_rows {
        let week_id = super::guid(row, "guid")?;
        let test_id: Option<String> = row.try_get("test_id")?;
        let test = match test_id {
            Some(raw) => Some(TestOutline {
                id: elearn_common::uuid_utils::parse(&raw)?,
                pass_marks: row.try_get("pass_marks")?,
                unlocks_next_week: row.try_get("unlocks_next_week")?,
            }),
            None => None,
        };

        weeks.push(WeekOutline {
            number: row.try_get("week_number")?,
            published: row.try_get("is_published")?,
            unlock_date: row.try_get("unlock_date")?,
            session_ids: sessions_by_week.remove(&week_id).unwrap_or_default(),
            test,
        });
    }

    Ok(CourseOutline { weeks })
}

pub async fn upsert(
    conn: &mut SqliteConnection,
    enrollment_id: Uuid,
    snapshot: &ProgressSnapshot,
    computed_on: NaiveDate,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO progress (
            enrollment_id, videos_watched, videos_total, tests_attempted, tests_passed,
            tests_total, average_score, current_week_unlocked, progress_percent, is_passed,
            computed_on, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (enrollment_id) DO UPDATE SET
            videos_watched = excluded.videos_watched,
            videos_total = excluded.videos_total,
            tests_attempted = excluded.tests_attempted,
            tests_passed = excluded.tests_passed,
            tests_total = excluded.tests_total,
            average_score = excluded.average_score,
            current_week_unlocked = excluded.current_week_unlocked,
            progress_percent = excluded.progress_percent,
            is_passed = excluded.is_passed,
            computed_on = excluded.computed_on,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(enrollment_id.to_string())
    .bind(snapshot.videos_watched)
    .bind(snapshot.videos_total)
    .bind(snapshot.tests_attempted)
    .bind(snapshot.tests_passed)
    .bind(snapshot.tests_total)
    .bind(snapshot.average_score)
    .bind(snapshot.current_week_unlocked)
    .bind(snapshot.progress_percent)
    .bind(snapshot.is_passed)
    .bind(computed_on)
    .bind(elearn_common::time::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn get(
    conn: &mut SqliteConnection,
    enrollment_id: Uuid,
) -> Result<Option<ProgressRecord>> {
    let row = sqlx::query(
        r#"
        SELECT enrollment_id, videos_watched, videos_total, tests_attempted, tests_passed,
               tests_total, average_score, current_week_unlocked, progress_percent, is_passed,
               computed_on
        FROM progress WHERE enrollment_id = ?
        "#,
    )
    .bind(enrollment_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(ProgressRecord {
        enrollment_id: super::guid(&row, "enrollment_id")?,
        snapshot: ProgressSnapshot {
            videos_watched: row.try_get("videos_watched")?,
            videos_total: row.try_get("videos_total")?,
            tests_attempted: row.try_get("tests_attempted")?,
            tests_passed: row.try_get("tests_passed")?,
            tests_total: row.try_get("tests_total")?,
            average_score: row.try_get("average_score")?,
            current_week_unlocked: row.try_get("current_week_unlocked")?,
            progress_percent: row.try_get("progress_percent")?,
            is_passed: row.try_get("is_passed")?,
        },
        computed_on: row.try_get("computed_on")?,
    }))
}
