//! Session views and test submissions

use elearn_common::db::{SessionView, SubmissionStatus, TestSubmission};
use elearn_common::progress::{EnrollmentFacts, SubmissionFact, ViewFact};
use elearn_common::{time, uuid_utils, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

const VIEW_COLUMNS: &str = "guid, enrollment_id, session_id, watched_percent, viewed_at";

const SUBMISSION_COLUMNS: &str = "guid, test_id, enrollment_id, attempt_number, answer, marks_obtained, remarks, status, is_passed, submitted_at, graded_at";

fn view_from_row(row: &SqliteRow) -> Result<SessionView> {
    Ok(SessionView {
        guid: super::guid(row, "guid")?,
        enrollment_id: super::guid(row, "enrollment_id")?,
        session_id: super::guid(row, "session_id")?,
        watched_percent: row.try_get("watched_percent")?,
        viewed_at: row.try_get("viewed_at")?,
    })
}

fn submission_from_row(row: &SqliteRow) -> Result<TestSubmission> {
    Ok(TestSubmission {
        guid: super::guid(row, "guid")?,
        test_id: super::guid(row, "test_id")?,
        enrollment_id: super::guid(row, "enrollment_id")?,
        attempt_number: row.try_get("attempt_number")?,
        answer: row.try_get("answer")?,
        marks_obtained: row.try_get("marks_obtained")?,
        remarks: row.try_get("remarks")?,
        status: super::status(row, "status")?,
        is_passed: row.try_get("is_passed")?,
        submitted_at: row.try_get("submitted_at")?,
        graded_at: row.try_get("graded_at")?,
    })
}

/// Record a view; the stored percentage only ever grows
pub async fn upsert_view(
    conn: &mut SqliteConnection,
    enrollment_id: Uuid,
    session_id: Uuid,
    watched_percent: f64,
) -> Result<SessionView> {
    sqlx::query(
        r#"
        INSERT INTO session_views (guid, enrollment_id, session_id, watched_percent, viewed_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (enrollment_id, session_id) DO UPDATE SET
            watched_percent = MAX(session_views.watched_percent, excluded.watched_percent),
            viewed_at = excluded.viewed_at
        "#,
    )
    .bind(uuid_utils::generate().to_string())
    .bind(enrollment_id.to_string())
    .bind(session_id.to_string())
    .bind(watched_percent)
    .bind(time::now())
    .execute(&mut *conn)
    .await?;

    let sql = format!(
        "SELECT {} FROM session_views WHERE enrollment_id = ? AND session_id = ?",
        VIEW_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(enrollment_id.to_string())
        .bind(session_id.to_string())
        .fetch_one(&mut *conn)
        .await?;
    view_from_row(&row)
}

pub async fn count_attempts(
    conn: &mut SqliteConnection,
    test_id: Uuid,
    enrollment_id: Uuid,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM test_submissions WHERE test_id = ? AND enrollment_id = ?",
    )
    .bind(test_id.to_string())
    .bind(enrollment_id.to_string())
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

pub async fn insert_submission(
    conn: &mut SqliteConnection,
    test_id: Uuid,
    enrollment_id: Uuid,
    attempt_number: i64,
    answer: &str,
) -> Result<TestSubmission> {
    let guid = uuid_utils::generate();
    let now = time::now();

    sqlx::query(
        r#"
        INSERT INTO test_submissions (guid, test_id, enrollment_id, attempt_number, answer, status, submitted_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind(test_id.to_string())
    .bind(enrollment_id.to_string())
    .bind(attempt_number)
    .bind(answer)
    .bind(SubmissionStatus::Submitted.as_str())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(TestSubmission {
        guid,
        test_id,
        enrollment_id,
        attempt_number,
        answer: answer.to_string(),
        marks_obtained: None,
        remarks: None,
        status: SubmissionStatus::Submitted,
        is_passed: false,
        submitted_at: now,
        graded_at: None,
    })
}

pub async fn get_submission(
    conn: &mut SqliteConnection,
    submission_id: Uuid,
) -> Result<Option<TestSubmission>> {
    let sql = format!(
        "SELECT {} FROM test_submissions WHERE guid = ?",
        SUBMISSION_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(submission_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(submission_from_row).transpose()
}

/// Persist the grading fields of `submission`
pub async fn save_grade(conn: &mut SqliteConnection, submission: &TestSubmission) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE test_submissions
        SET marks_obtained = ?, remarks = ?, status = ?, is_passed = ?, graded_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(submission.marks_obtained)
    .bind(&submission.remarks)
    .bind(submission.status.as_str())
    .bind(submission.is_passed)
    .bind(submission.graded_at)
    .bind(submission.guid.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Everything the progress aggregator needs for one enrollment
pub async fn for_enrollment(
    conn: &mut SqliteConnection,
    enrollment_id: Uuid,
) -> Result<EnrollmentFacts> {
    let view_rows = sqlx::query(
        "SELECT session_id, watched_percent FROM session_views WHERE enrollment_id = ?",
    )
    .bind(enrollment_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    let views = view_rows
        .iter()
        .map(|row| -> Result<ViewFact> {
            Ok(ViewFact {
                session_id: super::guid(row, "session_id")?,
                watched_percent: row.try_get("watched_percent")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let submission_rows = sqlx::query(
        r#"
        SELECT test_id, marks_obtained FROM test_submissions
        WHERE enrollment_id = ?
        ORDER BY attempt_number
        "#,
    )
    .bind(enrollment_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    let submissions = submission_rows
        .iter()
        .map(|row| -> Result<SubmissionFact> {
            Ok(SubmissionFact {
                test_id: super::guid(row, "test_id")?,
                marks_obtained: row.try_get("marks_obtained")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(EnrollmentFacts { views, submissions })
}
