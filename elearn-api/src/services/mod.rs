//! Transactional services
//!
//! Each function runs on a connection supplied by the handler, normally a
//! transaction covering the whole request. Nothing here commits.

pub mod curriculum;
pub mod delete_guard;
pub mod learning;
pub mod progress;
pub mod publish_gate;
pub mod renumber;

use chrono::NaiveDate;
use elearn_common::{ProgressPolicy, ReorderStrategy};
use serde::{Deserialize, Deserializer};

/// Settings that shape a mutation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rules {
    pub policy: ProgressPolicy,
    pub reorder_strategy: ReorderStrategy,
    /// Date used for unlock decisions
    pub as_of: NaiveDate,
}

/// Distinguish an absent field (`None`) from an explicit null (`Some(None)`)
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Reject blank titles
pub(crate) fn require_title(title: &str) -> elearn_common::Result<()> {
    if title.trim().is_empty() {
        Err(elearn_common::Error::InvalidInput(
            "title must not be empty".to_string(),
        ))
    } else {
        Ok(())
    }
}
