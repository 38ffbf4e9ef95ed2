//! Common error types for eLearn
//!
//! Business-rule violations (sequence gaps, out-of-range positions, publish
//! preconditions, dependency blocks, uniqueness conflicts) are first-class
//! variants so the HTTP layer can map each one to a client-facing response.

use thiserror::Error;

/// Common result type for eLearn operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the eLearn crates
#[derive(Error, Debug)]
pub enum Error {
    /// Creation at `requested` while earlier positions are still empty
    #[error("{}", gap_message(.label, .requested, .missing))]
    SequenceGap {
        label: &'static str,
        requested: i64,
        missing: Vec<i64>,
    },

    /// Target position outside `1..=max`
    #[error("{label} number must be between 1 and {max}.")]
    SequenceRange {
        label: &'static str,
        requested: i64,
        max: i64,
    },

    /// Publish attempted while required content is missing
    #[error("Cannot publish this week: {}", .0.join("; "))]
    PublishPrecondition(Vec<String>),

    /// Delete attempted while active dependents exist
    #[error("Cannot delete {entity}: {}", .blockers.join("; "))]
    DependencyBlock {
        entity: String,
        blockers: Vec<String>,
    },

    /// Storage rejected a duplicate key
    #[error("Conflict: {0}")]
    UniquenessConflict(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Enumerated reasons attached to a business-rule failure.
    ///
    /// Empty for errors that carry only a message.
    pub fn details(&self) -> Vec<String> {
        match self {
            Error::SequenceGap { label, missing, .. } => missing
                .iter()
                .map(|position| format!("{} {} is missing", label, position))
                .collect(),
            Error::SequenceRange { requested, max, .. } => {
                vec![format!("requested {}, allowed 1..={}", requested, max)]
            }
            Error::PublishPrecondition(unmet) => unmet.clone(),
            Error::DependencyBlock { blockers, .. } => blockers.clone(),
            _ => Vec::new(),
        }
    }

    /// True for failures caused by the caller's request rather than the server
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_)
        )
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Error::UniquenessConflict(db_err.message().to_string());
            }
        }
        Error::Database(err)
    }
}

fn gap_message(label: &str, requested: &i64, missing: &[i64]) -> String {
    let missing = missing
        .iter()
        .map(|position| position.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{} {} must be created first before adding {} {}.",
        label, missing, label, requested
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gap_message_lists_every_missing_position() {
        let err = Error::SequenceGap {
            label: "Week",
            requested: 5,
            missing: vec![2, 4],
        };
        assert_eq!(
            err.to_string(),
            "Week 2, 4 must be created first before adding Week 5."
        );
        assert_eq!(err.details(), vec!["Week 2 is missing", "Week 4 is missing"]);
    }

    #[test]
    fn test_range_message() {
        let err = Error::SequenceRange {
            label: "Session",
            requested: 7,
            max: 3,
        };
        assert_eq!(err.to_string(), "Session number must be between 1 and 3.");
    }

    #[test]
    fn test_dependency_block_message() {
        let err = Error::DependencyBlock {
            entity: "week 2".to_string(),
            blockers: vec![
                "1 active enrollment(s)".to_string(),
                "batch 'Evening' has 1 active student(s)".to_string(),
            ],
        };
        assert!(err.to_string().starts_with("Cannot delete week 2: 1 active enrollment(s)"));
        assert_eq!(err.details().len(), 2);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_internal_errors_are_not_client_errors() {
        assert!(!Error::Internal("boom".to_string()).is_client_error());
        assert!(!Error::Config("bad".to_string()).is_client_error());
        assert!(Error::NotFound("course".to_string()).is_client_error());
    }
}
