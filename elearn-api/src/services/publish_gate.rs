//! Publish-gate validator
//!
//! A week may become published only once it has at least one session and
//! its test. The gate runs on the unpublished to published transition only.

use elearn_common::{Error, Result};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::db;

/// Content present under a week
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReadiness {
    pub week_number: i64,
    pub session_count: i64,
    pub has_test: bool,
}

impl PublishReadiness {
    /// Every unmet precondition, in a stable order
    pub fn unmet(&self) -> Vec<String> {
        let mut unmet = Vec::new();
        if self.session_count == 0 {
            unmet.push(format!(
                "Week {} needs at least one session",
                self.week_number
            ));
        }
        if !self.has_test {
            unmet.push(format!("Week {} needs a test", self.week_number));
        }
        unmet
    }

    pub fn can_publish(&self) -> bool {
        self.unmet().is_empty()
    }
}

pub async fn readiness(
    conn: &mut SqliteConnection,
    week_id: Uuid,
    week_number: i64,
) -> Result<PublishReadiness> {
    let session_count = db::sessions::count(conn, week_id).await?;
    let has_test = db::weekly_tests::for_week(conn, week_id).await?.is_some();

    Ok(PublishReadiness {
        week_number,
        session_count,
        has_test,
    })
}

pub async fn can_publish(conn: &mut SqliteConnection, week_id: Uuid, week_number: i64) -> Result<bool> {
    Ok(readiness(conn, week_id, week_number).await?.can_publish())
}

/// Fail with every unmet precondition
pub async fn validate_publish(
    conn: &mut SqliteConnection,
    week_id: Uuid,
    week_number: i64,
) -> Result<()> {
    let unmet = readiness(conn, week_id, week_number).await?.unmet();
    if unmet.is_empty() {
        Ok(())
    } else {
        Err(Error::PublishPrecondition(unmet))
    }
}
