//! Progress aggregation
//!
//! Pure computation of an enrollment's progress record from the course
//! structure and the enrollment's recorded facts. Storage and transactions
//! live in the service layer; given the same outline, facts, policy and
//! as-of date, [`aggregate`] always returns the same snapshot.

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// A view at or above this percentage counts as a watched video
pub const VIDEO_COMPLETION_THRESHOLD: f64 = 90.0;

/// Weights used to blend video and test completion into one percentage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressPolicy {
    pub video_weight: f64,
    pub test_weight: f64,
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self {
            video_weight: 0.5,
            test_weight: 0.5,
        }
    }
}

impl ProgressPolicy {
    /// Reject negative, non-finite, or all-zero weights
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("video_weight", self.video_weight),
            ("test_weight", self.test_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::Config(format!(
                    "progress.{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        if self.video_weight + self.test_weight <= 0.0 {
            return Err(Error::Config(
                "progress weights must not both be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// The week's test as far as progress is concerned
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutline {
    pub id: Uuid,
    pub pass_marks: f64,
    pub unlocks_next_week: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekOutline {
    pub number: i64,
    pub published: bool,
    pub unlock_date: Option<NaiveDate>,
    pub session_ids: Vec<Uuid>,
    pub test: Option<TestOutline>,
}

/// Ordered week structure of a course
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseOutline {
    pub weeks: Vec<WeekOutline>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewFact {
    pub session_id: Uuid,
    pub watched_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionFact {
    pub test_id: Uuid,
    /// `None` until graded
    pub marks_obtained: Option<f64>,
}

/// Everything an enrollment has recorded so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrollmentFacts {
    pub views: Vec<ViewFact>,
    pub submissions: Vec<SubmissionFact>,
}

/// Derived progress record for one enrollment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub videos_watched: i64,
    pub videos_total: i64,
    pub tests_attempted: i64,
    pub tests_passed: i64,
    pub tests_total: i64,
    pub average_score: f64,
    pub current_week_unlocked: i64,
    pub progress_percent: f64,
    pub is_passed: bool,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            videos_watched: 0,
            videos_total: 0,
            tests_attempted: 0,
            tests_passed: 0,
            tests_total: 0,
            average_score: 0.0,
            current_week_unlocked: 1,
            progress_percent: 0.0,
            is_passed: false,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn is_passing(test: &TestOutline, facts: &EnrollmentFacts) -> bool {
    facts.submissions.iter().any(|submission| {
        submission.test_id == test.id
            && submission
                .marks_obtained
                .map(|marks| marks >= test.pass_marks)
                .unwrap_or(false)
    })
}

/// Highest unlocked week number among published weeks
///
/// The first published week is always open. A later week opens on its
/// unlock date, or when the week before it is open and that week's gate is
/// open: it has no test, its test does not gate the next week, or the
/// enrollment has a passing submission for it.
pub fn current_week_unlocked(
    outline: &CourseOutline,
    facts: &EnrollmentFacts,
    as_of: NaiveDate,
) -> i64 {
    let mut weeks: Vec<&WeekOutline> = outline.weeks.iter().filter(|w| w.published).collect();
    weeks.sort_by_key(|week| week.number);

    let mut highest = 1;
    let mut previous_open: Option<bool> = None;

    for week in weeks {
        let by_date = week.unlock_date.map(|date| date <= as_of).unwrap_or(false);
        let unlocked = match previous_open {
            None => true,
            Some(gate) => by_date || gate,
        };

        if unlocked {
            highest = highest.max(week.number);
        }

        let gate_open = match &week.test {
            None => true,
            Some(test) => !test.unlocks_next_week || is_passing(test, facts),
        };
        previous_open = Some(unlocked && gate_open);
    }

    highest
}

/// Blend video and test completion into a 0-100 percentage
fn blend(snapshot: &ProgressSnapshot, policy: &ProgressPolicy) -> f64 {
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;

    if snapshot.videos_total > 0 {
        weighted +=
            policy.video_weight * snapshot.videos_watched as f64 / snapshot.videos_total as f64;
        weight_sum += policy.video_weight;
    }
    if snapshot.tests_total > 0 {
        weighted +=
            policy.test_weight * snapshot.tests_passed as f64 / snapshot.tests_total as f64;
        weight_sum += policy.test_weight;
    }

    if weight_sum <= 0.0 {
        return 0.0;
    }
    round2(100.0 * weighted / weight_sum)
}

/// Compute the progress snapshot for one enrollment
///
/// Only published weeks count toward totals. Facts about sessions or tests
/// outside published weeks are ignored.
pub fn aggregate(
    outline: &CourseOutline,
    facts: &EnrollmentFacts,
    policy: &ProgressPolicy,
    as_of: NaiveDate,
) -> ProgressSnapshot {
    let published: Vec<&WeekOutline> = outline.weeks.iter().filter(|w| w.published).collect();

    let sessions: HashSet<Uuid> = published
        .iter()
        .flat_map(|week| week.session_ids.iter().copied())
        .collect();
    let tests: Vec<&TestOutline> = published.iter().filter_map(|week| week.test.as_ref()).collect();
    let test_ids: HashSet<Uuid> = tests.iter().map(|test| test.id).collect();

    let watched: HashSet<Uuid> = facts
        .views
        .iter()
        .filter(|view| {
            view.watched_percent >= VIDEO_COMPLETION_THRESHOLD && sessions.contains(&view.session_id)
        })
        .map(|view| view.session_id)
        .collect();

    let attempted: HashSet<Uuid> = facts
        .submissions
        .iter()
        .filter(|submission| test_ids.contains(&submission.test_id))
        .map(|submission| submission.test_id)
        .collect();

    let passed = tests.iter().filter(|test| is_passing(test, facts)).count() as i64;

    let graded: Vec<f64> = facts
        .submissions
        .iter()
        .filter(|submission| test_ids.contains(&submission.test_id))
        .filter_map(|submission| submission.marks_obtained)
        .collect();
    let average_score = if graded.is_empty() {
        0.0
    } else {
        round2(graded.iter().sum::<f64>() / graded.len() as f64)
    };

    let mut snapshot = ProgressSnapshot {
        videos_watched: watched.len() as i64,
        videos_total: sessions.len() as i64,
        tests_attempted: attempted.len() as i64,
        tests_passed: passed,
        tests_total: tests.len() as i64,
        average_score,
        current_week_unlocked: current_week_unlocked(outline, facts, as_of),
        progress_percent: 0.0,
        is_passed: false,
    };
    snapshot.progress_percent = blend(&snapshot, policy);
    snapshot.is_passed = snapshot.tests_total > 0 && snapshot.tests_passed == snapshot.tests_total;
    snapshot
}
