//! Enrollment-side writes: enrolling, views, submissions and grading
//!
//! Every write that changes what counts toward progress recomputes the
//! affected enrollment on the same connection.

use elearn_common::db::{
    Enrollment, EnrollmentStatus, ProgressRecord, SessionView, SubmissionStatus, TestSubmission,
};
use elearn_common::{time, Error, Result};
use serde::Deserialize;
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use super::{progress, Rules};
use crate::db;

#[derive(Debug, Clone, Deserialize)]
pub struct EnrollInput {
    pub student_id: String,
    #[serde(default)]
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewInput {
    pub session_id: Uuid,
    pub watched_percent: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionInput {
    pub test_id: Uuid,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradeInput {
    pub marks_obtained: f64,
    pub remarks: Option<String>,
}

fn validate_percent(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{} must be between 0 and 100, got {}",
            name, value
        )))
    }
}

fn require_active(enrollment: &Enrollment) -> Result<()> {
    if enrollment.status == EnrollmentStatus::Active {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Enrollment is {}, not active",
            enrollment.status
        )))
    }
}

/// An enrollment, or NotFound
pub async fn load_enrollment(
    conn: &mut SqliteConnection,
    enrollment_id: Uuid,
) -> Result<Enrollment> {
    db::enrollments::get(conn, enrollment_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("enrollment {}", enrollment_id)))
}

/// Enroll a student in a batch and create their progress row
pub async fn enroll(
    conn: &mut SqliteConnection,
    rules: &Rules,
    batch_id: Uuid,
    input: EnrollInput,
) -> Result<(Enrollment, ProgressRecord)> {
    let student_id = input.student_id.trim();
    if student_id.is_empty() {
        return Err(Error::InvalidInput("student_id must not be empty".to_string()));
    }

    let batch = db::batches::get(conn, batch_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("batch {}", batch_id)))?;

    if db::enrollments::seats_taken(conn, batch_id).await? >= batch.max_students {
        return Err(Error::InvalidInput(format!(
            "Batch '{}' is full ({} students)",
            batch.name, batch.max_students
        )));
    }

    let enrollment = db::enrollments::insert(conn, batch_id, student_id, input.status).await?;
    let record = progress::recompute(conn, enrollment.guid, &rules.policy, rules.as_of).await?;

    info!(
        "Enrolled student {} in batch {} ({})",
        enrollment.student_id, batch.code, enrollment.guid
    );
    Ok((enrollment, record))
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    enrollment_id: Uuid,
    status: EnrollmentStatus,
) -> Result<Enrollment> {
    let mut enrollment = load_enrollment(conn, enrollment_id).await?;
    if enrollment.status != status {
        db::enrollments::set_status(conn, enrollment_id, status).await?;
        info!(
            "Enrollment {} status {} -> {}",
            enrollment_id, enrollment.status, status
        );
        enrollment.status = status;
    }
    Ok(enrollment)
}

/// Record how much of a session the student watched
pub async fn record_view(
    conn: &mut SqliteConnection,
    rules: &Rules,
    enrollment: &Enrollment,
    input: ViewInput,
) -> Result<(SessionView, ProgressRecord)> {
    validate_percent("watched_percent", input.watched_percent)?;
    require_active(enrollment)?;

    let course_id = db::enrollments::course_of(conn, enrollment.guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("enrollment {}", enrollment.guid)))?;

    let placement = db::sessions::placement(conn, input.session_id)
        .await?
        .filter(|placement| placement.course_id == course_id)
        .ok_or_else(|| Error::NotFound(format!("session {}", input.session_id)))?;
    if !placement.week_published {
        return Err(Error::InvalidInput(
            "Session belongs to an unpublished week".to_string(),
        ));
    }

    let view =
        db::facts::upsert_view(conn, enrollment.guid, input.session_id, input.watched_percent)
            .await?;
    let record = progress::recompute(conn, enrollment.guid, &rules.policy, rules.as_of).await?;

    info!(
        "Recorded view of session {} by enrollment {} at {}%",
        input.session_id, enrollment.guid, view.watched_percent
    );
    Ok((view, record))
}

/// Submit the next attempt at a test
pub async fn submit(
    conn: &mut SqliteConnection,
    rules: &Rules,
    enrollment: &Enrollment,
    input: SubmissionInput,
) -> Result<TestSubmission> {
    require_active(enrollment)?;

    let course_id = db::enrollments::course_of(conn, enrollment.guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("enrollment {}", enrollment.guid)))?;

    let (test_course, week_published) = db::weekly_tests::placement(conn, input.test_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("test {}", input.test_id)))?;
    if test_course != course_id {
        return Err(Error::NotFound(format!("test {}", input.test_id)));
    }
    if !week_published {
        return Err(Error::InvalidInput(
            "Test belongs to an unpublished week".to_string(),
        ));
    }

    let test = db::weekly_tests::get(conn, input.test_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("test {}", input.test_id)))?;

    let attempts = db::facts::count_attempts(conn, test.guid, enrollment.guid).await?;
    if attempts >= test.max_attempts {
        return Err(Error::InvalidInput(format!(
            "Maximum attempts ({}) reached for this test",
            test.max_attempts
        )));
    }

    let submission =
        db::facts::insert_submission(conn, test.guid, enrollment.guid, attempts + 1, &input.answer)
            .await?;
    progress::recompute(conn, enrollment.guid, &rules.policy, rules.as_of).await?;

    info!(
        "Enrollment {} submitted attempt {} of test {}",
        enrollment.guid, submission.attempt_number, test.guid
    );
    Ok(submission)
}

/// Grade a submission and recompute the submitting enrollment
pub async fn grade(
    conn: &mut SqliteConnection,
    rules: &Rules,
    submission_id: Uuid,
    input: GradeInput,
) -> Result<TestSubmission> {
    validate_percent("marks_obtained", input.marks_obtained)?;

    let mut submission = db::facts::get_submission(conn, submission_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("submission {}", submission_id)))?;
    let test = db::weekly_tests::get(conn, submission.test_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("test {}", submission.test_id)))?;

    submission.marks_obtained = Some(input.marks_obtained);
    submission.remarks = input.remarks;
    submission.status = SubmissionStatus::Graded;
    submission.is_passed = input.marks_obtained >= test.pass_marks;
    submission.graded_at = Some(time::now());
    db::facts::save_grade(conn, &submission).await?;

    progress::recompute(conn, submission.enrollment_id, &rules.policy, rules.as_of).await?;

    info!(
        "Graded submission {}: {} ({})",
        submission.guid,
        input.marks_obtained,
        if submission.is_passed { "passed" } else { "failed" }
    );
    Ok(submission)
}
