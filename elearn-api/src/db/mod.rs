//! Repositories
//!
//! Every function takes `&mut SqliteConnection` so the same code runs on a
//! pooled connection for reads and inside a request's transaction for
//! writes. Guids are stored as TEXT.

pub mod batches;
pub mod courses;
pub mod enrollments;
pub mod facts;
pub mod progress;
pub mod sequence;
pub mod sessions;
pub mod weekly_tests;
pub mod weeks;

use elearn_common::{uuid_utils, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

/// Read a TEXT guid column
pub(crate) fn guid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    uuid_utils::parse(&raw)
}

/// Read a TEXT status column into its enum
pub(crate) fn status<T>(row: &SqliteRow, column: &str) -> Result<T>
where
    T: FromStr<Err = elearn_common::Error>,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
}
