//! Database models

use crate::progress::ProgressSnapshot;
use crate::Error;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Implements `as_str`, `Display` and `FromStr` for a lowercase status enum
macro_rules! status_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::InvalidInput(format!(
                        "Unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    #[default]
    Upcoming,
    Active,
    Completed,
    Cancelled,
    OnHold,
}

status_enum!(BatchStatus {
    Upcoming => "upcoming",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
    OnHold => "on_hold",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Dropped,
    Suspended,
}

status_enum!(EnrollmentStatus {
    Pending => "pending",
    Active => "active",
    Completed => "completed",
    Dropped => "dropped",
    Suspended => "suspended",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Submitted,
    Graded,
    Returned,
}

status_enum!(SubmissionStatus {
    Submitted => "submitted",
    Graded => "graded",
    Returned => "returned",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub guid: Uuid,
    pub code: String,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub guid: Uuid,
    pub course_id: Uuid,
    pub code: String,
    pub name: String,
    pub status: BatchStatus,
    pub max_students: i64,
    pub start_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub guid: Uuid,
    pub batch_id: Uuid,
    pub student_id: String,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Week {
    pub guid: Uuid,
    pub course_id: Uuid,
    pub week_number: i64,
    pub title: String,
    pub description: String,
    pub unlock_date: Option<NaiveDate>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSession {
    pub guid: Uuid,
    pub week_id: Uuid,
    pub session_number: i64,
    pub title: String,
    pub description: String,
    pub video_url: Option<String>,
    pub duration_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyTest {
    pub guid: Uuid,
    pub week_id: Uuid,
    pub title: String,
    pub instructions: String,
    pub questions: String,
    pub pass_marks: f64,
    pub max_attempts: i64,
    pub unlocks_next_week: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub guid: Uuid,
    pub enrollment_id: Uuid,
    pub session_id: Uuid,
    pub watched_percent: f64,
    pub viewed_at: DateTime<Utc>,
}

impl SessionView {
    pub fn is_completed(&self) -> bool {
        self.watched_percent >= crate::progress::VIDEO_COMPLETION_THRESHOLD
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSubmission {
    pub guid: Uuid,
    pub test_id: Uuid,
    pub enrollment_id: Uuid,
    pub attempt_number: i64,
    pub answer: String,
    pub marks_obtained: Option<f64>,
    pub remarks: Option<String>,
    pub status: SubmissionStatus,
    pub is_passed: bool,
    pub submitted_at: DateTime<Utc>,
    pub graded_at: Option<DateTime<Utc>>,
}

/// Stored progress row: the snapshot plus the date it was computed for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub enrollment_id: Uuid,
    #[serde(flatten)]
    pub snapshot: ProgressSnapshot,
    pub computed_on: NaiveDate,
}
