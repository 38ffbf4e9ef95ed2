//! Database schema migrations
//!
//! Versioned, idempotent upgrades applied after the tables are created.
//! The applied version is tracked in the `schema_version` table.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field were upgraded by them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Check before altering** - every migration must be safe to run twice

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: add `unlocks_next_week` to weekly_tests
///
/// The base table has no per-test gating flag; existing tests keep gating
/// the following week.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('weekly_tests') WHERE name = 'unlocks_next_week'",
    )
    .fetch_one(pool)
    .await?;

    if has_column > 0 {
        info!("  unlocks_next_week column already exists - skipping");
        return Ok(());
    }

    sqlx::query(
        "ALTER TABLE weekly_tests ADD COLUMN unlocks_next_week INTEGER NOT NULL DEFAULT 1",
    )
    .execute(pool)
    .await?;

    info!("  Added unlocks_next_week column to weekly_tests");
    Ok(())
}

/// Migration v2: indexes for per-enrollment fact lookups
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_session_views_enrollment ON session_views(enrollment_id)",
        "CREATE INDEX IF NOT EXISTS idx_test_submissions_enrollment ON test_submissions(enrollment_id)",
        "CREATE INDEX IF NOT EXISTS idx_enrollments_student ON enrollments(student_id)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("  Created fact lookup indexes");
    Ok(())
}
