//! Week, session and test mutations
//!
//! Ties the sequence store, the renumbering engine, the publish gate, the
//! delete guard and progress recompute together. Checks run before any
//! write, so a refused request changes nothing even before rollback.

use chrono::NaiveDate;
use elearn_common::db::{ClassSession, Week, WeeklyTest};
use elearn_common::{time, Error, Result};
use serde::Deserialize;
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use super::{delete_guard, progress, publish_gate, renumber, require_title, Rules};
use crate::db;
use crate::db::sequence::SequenceScope;

const DEFAULT_PASS_MARKS: f64 = 50.0;
const DEFAULT_MAX_ATTEMPTS: i64 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct WeekInput {
    /// Appended after the last week when omitted
    pub week_number: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub unlock_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeekPatch {
    pub week_number: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub unlock_date: Option<Option<NaiveDate>>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionInput {
    pub session_number: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub video_url: Option<String>,
    #[serde(default)]
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionPatch {
    pub session_number: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub video_url: Option<Option<String>>,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestInput {
    pub title: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub questions: String,
    pub pass_marks: Option<f64>,
    pub max_attempts: Option<i64>,
    pub unlocks_next_week: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestPatch {
    pub title: Option<String>,
    pub instructions: Option<String>,
    pub questions: Option<String>,
    pub pass_marks: Option<f64>,
    pub max_attempts: Option<i64>,
    pub unlocks_next_week: Option<bool>,
}

fn validate_duration(minutes: i64) -> Result<()> {
    if minutes < 0 {
        return Err(Error::InvalidInput(
            "duration_minutes must not be negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_test_limits(pass_marks: f64, max_attempts: i64) -> Result<()> {
    if !(0.0..=100.0).contains(&pass_marks) {
        return Err(Error::InvalidInput(format!(
            "pass_marks must be between 0 and 100, got {}",
            pass_marks
        )));
    }
    if max_attempts < 1 {
        return Err(Error::InvalidInput(format!(
            "max_attempts must be at least 1, got {}",
            max_attempts
        )));
    }
    Ok(())
}

async fn require_course(conn: &mut SqliteConnection, course_id: Uuid) -> Result<()> {
    db::courses::get(conn, course_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| Error::NotFound(format!("course {}", course_id)))
}

/// A week of the course, or NotFound
pub async fn load_week(
    conn: &mut SqliteConnection,
    course_id: Uuid,
    week_id: Uuid,
) -> Result<Week> {
    db::weeks::get(conn, course_id, week_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("week {}", week_id)))
}

/// A session of the week, or NotFound
pub async fn load_session(
    conn: &mut SqliteConnection,
    week_id: Uuid,
    session_id: Uuid,
) -> Result<ClassSession> {
    db::sessions::get(conn, week_id, session_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))
}

/// The week's test, or NotFound
pub async fn load_test(conn: &mut SqliteConnection, week: &Week) -> Result<WeeklyTest> {
    db::weekly_tests::for_week(conn, week.guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("test for week {}", week.week_number)))
}

// ============================================================================
// Weeks
// ============================================================================

pub async fn create_week(
    conn: &mut SqliteConnection,
    course_id: Uuid,
    input: WeekInput,
) -> Result<Week> {
    require_course(conn, course_id).await?;
    require_title(&input.title)?;

    let scope = SequenceScope::Weeks { course_id };
    let week_number = renumber::insert_position(conn, scope, input.week_number).await?;

    // A brand-new week has neither sessions nor a test
    if input.is_published {
        let readiness = publish_gate::PublishReadiness {
            week_number,
            session_count: 0,
            has_test: false,
        };
        return Err(Error::PublishPrecondition(readiness.unmet()));
    }

    let week = db::weeks::insert(
        conn,
        db::weeks::NewWeek {
            course_id,
            week_number,
            title: input.title,
            description: input.description,
            unlock_date: input.unlock_date,
        },
    )
    .await?;

    info!(
        "Created week {} ({}) in course {}",
        week.week_number, week.guid, course_id
    );
    Ok(week)
}

pub async fn update_week(
    conn: &mut SqliteConnection,
    rules: &Rules,
    course_id: Uuid,
    week_id: Uuid,
    patch: WeekPatch,
) -> Result<Week> {
    let mut week = load_week(conn, course_id, week_id).await?;

    if let Some(title) = &patch.title {
        require_title(title)?;
    }

    let publishing = patch.is_published == Some(true) && !week.is_published;
    if publishing {
        publish_gate::validate_publish(conn, week.guid, week.week_number).await?;
    }

    let mut renumbered = false;
    if let Some(target) = patch.week_number {
        let plan = renumber::move_item(
            conn,
            SequenceScope::Weeks { course_id },
            week.guid,
            target,
            rules.reorder_strategy,
        )
        .await?;
        if let Some(moved) = plan.item {
            info!(
                "Renumbered week {} from {} to {} in course {}",
                week.guid, moved.from, moved.to, course_id
            );
            renumbered = true;
        }
    }

    let was_published = week.is_published;
    if let Some(title) = patch.title {
        week.title = title;
    }
    if let Some(description) = patch.description {
        week.description = description;
    }
    if let Some(unlock_date) = patch.unlock_date {
        week.unlock_date = unlock_date;
    }
    if let Some(is_published) = patch.is_published {
        week.is_published = is_published;
    }
    week.updated_at = time::now();
    db::weeks::update_fields(conn, &week).await?;

    if was_published != week.is_published {
        info!(
            "Week {} of course {} is now {}",
            week.guid,
            course_id,
            if week.is_published { "published" } else { "unpublished" }
        );
    }
    // Unlocked week numbers shift with any renumbering, published or not
    if renumbered || was_published || week.is_published {
        progress::recompute_course(conn, course_id, &rules.policy, rules.as_of).await?;
    }

    load_week(conn, course_id, week_id).await
}

pub async fn delete_week(
    conn: &mut SqliteConnection,
    rules: &Rules,
    course_id: Uuid,
    week_id: Uuid,
) -> Result<()> {
    let week = load_week(conn, course_id, week_id).await?;
    delete_guard::check_content_delete(conn, course_id, &format!("week {}", week.week_number))
        .await?;

    db::weeks::delete(conn, week.guid).await?;
    let shifted =
        renumber::compact_after_removal(conn, SequenceScope::Weeks { course_id }, week.week_number)
            .await?;

    if week.is_published || shifted > 0 {
        progress::recompute_course(conn, course_id, &rules.policy, rules.as_of).await?;
    }

    info!(
        "Deleted week {} ({}) from course {}",
        week.week_number, week.guid, course_id
    );
    Ok(())
}

// ============================================================================
// Sessions
// ============================================================================

pub async fn create_session(
    conn: &mut SqliteConnection,
    rules: &Rules,
    course_id: Uuid,
    week_id: Uuid,
    input: SessionInput,
) -> Result<ClassSession> {
    let week = load_week(conn, course_id, week_id).await?;
    require_title(&input.title)?;
    validate_duration(input.duration_minutes)?;

    let scope = SequenceScope::Sessions { week_id };
    let session_number = renumber::insert_position(conn, scope, input.session_number).await?;

    let session = db::sessions::insert(
        conn,
        db::sessions::NewSession {
            week_id,
            session_number,
            title: input.title,
            description: input.description,
            video_url: input.video_url,
            duration_minutes: input.duration_minutes,
        },
    )
    .await?;

    if week.is_published {
        progress::recompute_course(conn, course_id, &rules.policy, rules.as_of).await?;
    }

    info!(
        "Created session {} ({}) in week {}",
        session.session_number, session.guid, week.week_number
    );
    Ok(session)
}

pub async fn update_session(
    conn: &mut SqliteConnection,
    rules: &Rules,
    course_id: Uuid,
    week_id: Uuid,
    session_id: Uuid,
    patch: SessionPatch,
) -> Result<ClassSession> {
    load_week(conn, course_id, week_id).await?;
    let mut session = load_session(conn, week_id, session_id).await?;

    if let Some(title) = &patch.title {
        require_title(title)?;
    }
    if let Some(minutes) = patch.duration_minutes {
        validate_duration(minutes)?;
    }

    if let Some(target) = patch.session_number {
        let plan = renumber::move_item(
            conn,
            SequenceScope::Sessions { week_id },
            session.guid,
            target,
            rules.reorder_strategy,
        )
        .await?;
        if let Some(moved) = plan.item {
            info!(
                "Renumbered session {} from {} to {} in week {}",
                session.guid, moved.from, moved.to, week_id
            );
        }
    }

    if let Some(title) = patch.title {
        session.title = title;
    }
    if let Some(description) = patch.description {
        session.description = description;
    }
    if let Some(video_url) = patch.video_url {
        session.video_url = video_url;
    }
    if let Some(minutes) = patch.duration_minutes {
        session.duration_minutes = minutes;
    }
    session.updated_at = time::now();
    db::sessions::update_fields(conn, &session).await?;

    load_session(conn, week_id, session_id).await
}

pub async fn delete_session(
    conn: &mut SqliteConnection,
    rules: &Rules,
    course_id: Uuid,
    week_id: Uuid,
    session_id: Uuid,
) -> Result<()> {
    let week = load_week(conn, course_id, week_id).await?;
    let session = load_session(conn, week_id, session_id).await?;

    if week.is_published {
        delete_guard::check_content_delete(
            conn,
            course_id,
            &format!(
                "session {} of week {}",
                session.session_number, week.week_number
            ),
        )
        .await?;

        if db::sessions::count(conn, week_id).await? <= 1 {
            return Err(Error::InvalidInput(format!(
                "Week {} is published; unpublish it before removing its last session",
                week.week_number
            )));
        }
    }

    db::sessions::delete(conn, session.guid).await?;
    renumber::compact_after_removal(
        conn,
        SequenceScope::Sessions { week_id },
        session.session_number,
    )
    .await?;

    if week.is_published {
        progress::recompute_course(conn, course_id, &rules.policy, rules.as_of).await?;
    }

    info!(
        "Deleted session {} ({}) from week {}",
        session.session_number, session.guid, week.week_number
    );
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

pub async fn create_test(
    conn: &mut SqliteConnection,
    course_id: Uuid,
    week_id: Uuid,
    input: TestInput,
) -> Result<WeeklyTest> {
    let week = load_week(conn, course_id, week_id).await?;
    require_title(&input.title)?;

    if db::weekly_tests::for_week(conn, week_id).await?.is_some() {
        return Err(Error::UniquenessConflict(format!(
            "Week {} already has a test",
            week.week_number
        )));
    }

    let pass_marks = input.pass_marks.unwrap_or(DEFAULT_PASS_MARKS);
    let max_attempts = input.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
    validate_test_limits(pass_marks, max_attempts)?;

    let test = db::weekly_tests::insert(
        conn,
        db::weekly_tests::NewTest {
            week_id,
            title: input.title,
            instructions: input.instructions,
            questions: input.questions,
            pass_marks,
            max_attempts,
            unlocks_next_week: input.unlocks_next_week.unwrap_or(true),
        },
    )
    .await?;

    info!("Created test {} for week {}", test.guid, week.week_number);
    Ok(test)
}

pub async fn update_test(
    conn: &mut SqliteConnection,
    rules: &Rules,
    course_id: Uuid,
    week_id: Uuid,
    patch: TestPatch,
) -> Result<WeeklyTest> {
    let week = load_week(conn, course_id, week_id).await?;
    let mut test = load_test(conn, &week).await?;

    if let Some(title) = &patch.title {
        require_title(title)?;
    }
    validate_test_limits(
        patch.pass_marks.unwrap_or(test.pass_marks),
        patch.max_attempts.unwrap_or(test.max_attempts),
    )?;

    if let Some(title) = patch.title {
        test.title = title;
    }
    if let Some(instructions) = patch.instructions {
        test.instructions = instructions;
    }
    if let Some(questions) = patch.questions {
        test.questions = questions;
    }
    if let Some(pass_marks) = patch.pass_marks {
        test.pass_marks = pass_marks;
    }
    if let Some(max_attempts) = patch.max_attempts {
        test.max_attempts = max_attempts;
    }
    if let Some(unlocks_next_week) = patch.unlocks_next_week {
        test.unlocks_next_week = unlocks_next_week;
    }
    test.updated_at = time::now();
    db::weekly_tests::update_fields(conn, &test).await?;

    // Pass marks and gating feed straight into progress
    if week.is_published {
        progress::recompute_course(conn, course_id, &rules.policy, rules.as_of).await?;
    }

    Ok(test)
}

pub async fn delete_test(
    conn: &mut SqliteConnection,
    course_id: Uuid,
    week_id: Uuid,
) -> Result<()> {
    let week = load_week(conn, course_id, week_id).await?;
    let test = load_test(conn, &week).await?;

    if week.is_published {
        delete_guard::check_content_delete(
            conn,
            course_id,
            &format!("test of week {}", week.week_number),
        )
        .await?;

        return Err(Error::InvalidInput(format!(
            "Week {} is published; unpublish it before removing its test",
            week.week_number
        )));
    }

    db::weekly_tests::delete(conn, test.guid).await?;
    info!("Deleted test {} from week {}", test.guid, week.week_number);
    Ok(())
}
