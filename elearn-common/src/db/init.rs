//! Database initialization
//!
//! Opens (or creates) the SQLite database, creates every table idempotently
//! and then runs the versioned migrations.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas go on the connect options so every pooled connection gets them
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema, used by tests
///
/// Held on a single connection that never expires; a second connection
/// would see a different, empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Create every table (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_courses_table(pool).await?;
    create_batches_table(pool).await?;
    create_enrollments_table(pool).await?;
    create_weeks_table(pool).await?;
    create_class_sessions_table(pool).await?;
    create_weekly_tests_table(pool).await?;

    // Fact tables
    create_session_views_table(pool).await?;
    create_test_submissions_table(pool).await?;

    // Derived
    create_progress_table(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_courses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            difficulty TEXT NOT NULL DEFAULT 'beginner',
            is_active INTEGER NOT NULL DEFAULT 1,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_batches_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS batches (
            guid TEXT PRIMARY KEY,
            course_id TEXT NOT NULL REFERENCES courses(guid) ON DELETE CASCADE,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'upcoming'
                CHECK (status IN ('upcoming', 'active', 'completed', 'cancelled', 'on_hold')),
            max_students INTEGER NOT NULL DEFAULT 30 CHECK (max_students > 0),
            start_date TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_batches_course ON batches(course_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_enrollments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enrollments (
            guid TEXT PRIMARY KEY,
            batch_id TEXT NOT NULL REFERENCES batches(guid) ON DELETE CASCADE,
            student_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'active', 'completed', 'dropped', 'suspended')),
            enrolled_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (batch_id, student_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_weeks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weeks (
            guid TEXT PRIMARY KEY,
            course_id TEXT NOT NULL REFERENCES courses(guid) ON DELETE CASCADE,
            week_number INTEGER NOT NULL CHECK (week_number > 0),
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            unlock_date TEXT,
            is_published INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (course_id, week_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_class_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS class_sessions (
            guid TEXT PRIMARY KEY,
            week_id TEXT NOT NULL REFERENCES weeks(guid) ON DELETE CASCADE,
            session_number INTEGER NOT NULL CHECK (session_number > 0),
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            video_url TEXT,
            duration_minutes INTEGER NOT NULL DEFAULT 0 CHECK (duration_minutes >= 0),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (week_id, session_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_weekly_tests_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weekly_tests (
            guid TEXT PRIMARY KEY,
            week_id TEXT NOT NULL UNIQUE REFERENCES weeks(guid) ON DELETE CASCADE,
            title TEXT NOT NULL,
            instructions TEXT NOT NULL DEFAULT '',
            questions TEXT NOT NULL DEFAULT '',
            pass_marks REAL NOT NULL DEFAULT 50 CHECK (pass_marks >= 0 AND pass_marks <= 100),
            max_attempts INTEGER NOT NULL DEFAULT 1 CHECK (max_attempts >= 1),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_session_views_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_views (
            guid TEXT PRIMARY KEY,
            enrollment_id TEXT NOT NULL REFERENCES enrollments(guid) ON DELETE CASCADE,
            session_id TEXT NOT NULL REFERENCES class_sessions(guid) ON DELETE CASCADE,
            watched_percent REAL NOT NULL DEFAULT 0
                CHECK (watched_percent >= 0 AND watched_percent <= 100),
            viewed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (enrollment_id, session_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_test_submissions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS test_submissions (
            guid TEXT PRIMARY KEY,
            test_id TEXT NOT NULL REFERENCES weekly_tests(guid) ON DELETE CASCADE,
            enrollment_id TEXT NOT NULL REFERENCES enrollments(guid) ON DELETE CASCADE,
            attempt_number INTEGER NOT NULL CHECK (attempt_number > 0),
            answer TEXT NOT NULL DEFAULT '',
            marks_obtained REAL CHECK (marks_obtained IS NULL OR (marks_obtained >= 0 AND marks_obtained <= 100)),
            remarks TEXT,
            is_passed INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'submitted'
                CHECK (status IN ('submitted', 'graded', 'returned')),
            submitted_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            graded_at TIMESTAMP,
            UNIQUE (test_id, enrollment_id, attempt_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_progress_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS progress (
            enrollment_id TEXT PRIMARY KEY REFERENCES enrollments(guid) ON DELETE CASCADE,
            videos_watched INTEGER NOT NULL DEFAULT 0,
            videos_total INTEGER NOT NULL DEFAULT 0,
            tests_attempted INTEGER NOT NULL DEFAULT 0,
            tests_passed INTEGER NOT NULL DEFAULT 0,
            tests_total INTEGER NOT NULL DEFAULT 0,
            average_score REAL NOT NULL DEFAULT 0,
            current_week_unlocked INTEGER NOT NULL DEFAULT 1,
            progress_percent REAL NOT NULL DEFAULT 0,
            is_passed INTEGER NOT NULL DEFAULT 0,
            computed_on TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
