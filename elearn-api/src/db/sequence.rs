//! Sequence store
//!
//! Positioned siblings under one parent: weeks of a course, sessions of a
//! week. A [`SequenceScope`] names the table and columns so both sequences
//! share one implementation.

use elearn_common::{Result, Slot};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceScope {
    Weeks { course_id: Uuid },
    Sessions { week_id: Uuid },
}

impl SequenceScope {
    fn table(&self) -> &'static str {
        match self {
            SequenceScope::Weeks { .. } => "weeks",
            SequenceScope::Sessions { .. } => "class_sessions",
        }
    }

    fn parent_column(&self) -> &'static str {
        match self {
            SequenceScope::Weeks { .. } => "course_id",
            SequenceScope::Sessions { .. } => "week_id",
        }
    }

    fn position_column(&self) -> &'static str {
        match self {
            SequenceScope::Weeks { .. } => "week_number",
            SequenceScope::Sessions { .. } => "session_number",
        }
    }

    fn parent(&self) -> String {
        match self {
            SequenceScope::Weeks { course_id } => course_id.to_string(),
            SequenceScope::Sessions { week_id } => week_id.to_string(),
        }
    }

    /// Human label used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            SequenceScope::Weeks { .. } => "Week",
            SequenceScope::Sessions { .. } => "Session",
        }
    }
}

/// Siblings ordered by position
pub async fn list(conn: &mut SqliteConnection, scope: SequenceScope) -> Result<Vec<Slot>> {
    let sql = format!(
        "SELECT guid, {position} AS position FROM {table} WHERE {parent} = ? ORDER BY {position}",
        position = scope.position_column(),
        table = scope.table(),
        parent = scope.parent_column(),
    );

    let rows = sqlx::query(&sql)
        .bind(scope.parent())
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| -> Result<Slot> {
            Ok(Slot {
                id: super::guid(row, "guid")?,
                position: row.try_get("position")?,
            })
        })
        .collect()
}

pub async fn position_exists(
    conn: &mut SqliteConnection,
    scope: SequenceScope,
    position: i64,
) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE {parent} = ? AND {position} = ?)",
        table = scope.table(),
        parent = scope.parent_column(),
        position = scope.position_column(),
    );

    let exists: bool = sqlx::query_scalar(&sql)
        .bind(scope.parent())
        .bind(position)
        .fetch_one(&mut *conn)
        .await?;

    Ok(exists)
}

/// Position an appended sibling would take
pub async fn next_position(conn: &mut SqliteConnection, scope: SequenceScope) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {table} WHERE {parent} = ?",
        table = scope.table(),
        parent = scope.parent_column(),
    );

    let count: i64 = sqlx::query_scalar(&sql)
        .bind(scope.parent())
        .fetch_one(&mut *conn)
        .await?;

    Ok(count + 1)
}

/// Write one sibling's position
pub async fn set_position(
    conn: &mut SqliteConnection,
    scope: SequenceScope,
    id: Uuid,
    position: i64,
) -> Result<()> {
    let sql = format!(
        "UPDATE {table} SET {position} = ?, updated_at = ? WHERE guid = ? AND {parent} = ?",
        table = scope.table(),
        position = scope.position_column(),
        parent = scope.parent_column(),
    );

    sqlx::query(&sql)
        .bind(position)
        .bind(elearn_common::time::now())
        .bind(id.to_string())
        .bind(scope.parent())
        .execute(&mut *conn)
        .await?;

    Ok(())
}
